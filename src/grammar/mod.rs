/*
    This module is for storing, checking and (de)serializing grammars
*/

pub mod cnf;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbol shown for an empty right-hand side.
pub const EPSILON: &str = "ε";

/// Spellings of epsilon accepted inside a right-hand side of a document.
pub const EPSILON_MARKERS: [&str; 2] = ["ε", "epsilon"];

pub fn is_epsilon_marker(symbol: &str) -> bool {
    EPSILON_MARKERS.contains(&symbol)
}

// The base unit in a rule as written in the text notation
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
}

// The symbols in a single alternative
pub type Alternative = Vec<Symbol>;

// The alternatives of a rewrite rule
pub type Rewrite = Vec<Alternative>;

/// How a symbol relates to a particular grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Nonterminal,
    Terminal,
    Epsilon,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Production {
    pub left: String,
    #[serde(default)]
    pub right: Vec<String>,
}

impl Production {
    pub fn new<S: Into<String>>(left: impl Into<String>, right: impl IntoIterator<Item = S>) -> Self {
        Production {
            left: left.into(),
            right: right.into_iter().map(Into::into).collect(),
        }
    }

    pub fn epsilon(left: impl Into<String>) -> Self {
        Production {
            left: left.into(),
            right: Vec::new(),
        }
    }

    /// True for an empty right side or one made only of epsilon markers.
    pub fn is_epsilon(&self) -> bool {
        self.right.iter().all(|s| is_epsilon_marker(s))
    }

    /// Right-hand symbols with epsilon markers removed.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.right.iter().map(String::as_str).filter(|s| !is_epsilon_marker(s))
    }
}

impl Display for Production {
    /// `A → aB` with the right side concatenated, `A → ε` for epsilon.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.right.as_slice() {
            [] => write!(f, "{} → {}", self.left, EPSILON),
            right => write!(f, "{} → {}", self.left, right.concat()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrammarKind {
    /// Type 2, recognized with CYK
    #[default]
    #[serde(rename = "type2")]
    ContextFree,
    /// Type 3, recognized with the linear grammar parser
    #[serde(rename = "type3")]
    Regular,
}

impl Display for GrammarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarKind::ContextFree => write!(f, "type2"),
            GrammarKind::Regular => write!(f, "type3"),
        }
    }
}

impl FromStr for GrammarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "type2" | "2" | "cfg" | "context-free" => Ok(GrammarKind::ContextFree),
            "type3" | "3" | "regular" => Ok(GrammarKind::Regular),
            other => Err(format!("unknown grammar kind `{}` (expected type2 or type3)", other)),
        }
    }
}

fn default_start() -> String {
    "S".to_string()
}

/// A formal grammar `(N, T, P, S)` together with its declared kind.
///
/// The serde layout is the persisted grammar document:
/// `{"type", "N", "T", "P", "S"}` in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    #[serde(rename = "type", default)]
    pub kind: GrammarKind,
    #[serde(rename = "N", default)]
    pub nonterminals: Vec<String>,
    #[serde(rename = "T", default)]
    pub terminals: Vec<String>,
    #[serde(rename = "P", default)]
    pub productions: Vec<Production>,
    #[serde(rename = "S", default = "default_start")]
    pub start: String,
}

/// A reason a grammar is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("start symbol `{0}` is not a nonterminal")]
    StartNotNonterminal(String),
    #[error("production {index}: left side `{left}` is not a nonterminal")]
    LeftNotNonterminal { index: usize, left: String },
    #[error("production {index}: symbol `{symbol}` is neither a nonterminal nor a terminal")]
    UndefinedSymbol { index: usize, symbol: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("could not access grammar file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed grammar document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Grammar {
    pub fn new<N, T>(
        kind: GrammarKind,
        nonterminals: N,
        terminals: T,
        productions: Vec<Production>,
        start: impl Into<String>,
    ) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Grammar {
            kind,
            nonterminals: nonterminals.into_iter().map(Into::into).collect(),
            terminals: terminals.into_iter().map(Into::into).collect(),
            productions,
            start: start.into(),
        }
    }

    pub fn is_nonterminal(&self, symbol: &str) -> bool {
        self.nonterminals.iter().any(|n| n == symbol)
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.iter().any(|t| t == symbol)
    }

    pub fn classify(&self, symbol: &str) -> SymbolKind {
        if self.is_nonterminal(symbol) {
            SymbolKind::Nonterminal
        } else if self.is_terminal(symbol) {
            SymbolKind::Terminal
        } else if is_epsilon_marker(symbol) {
            SymbolKind::Epsilon
        } else {
            SymbolKind::Undefined
        }
    }

    /// Productions rewriting `nonterminal`, in declaration order.
    pub fn productions_of<'a>(&'a self, nonterminal: &'a str) -> impl Iterator<Item = &'a Production> + 'a {
        self.productions.iter().filter(move |p| p.left == nonterminal)
    }

    /// Copy of this grammar deriving from another start symbol.
    pub fn with_start(&self, start: impl Into<String>) -> Self {
        Grammar {
            start: start.into(),
            ..self.clone()
        }
    }

    pub fn with_kind(&self, kind: GrammarKind) -> Self {
        Grammar { kind, ..self.clone() }
    }

    /// Structural well-formedness: `S ∈ N`, every left side in `N` and every
    /// right-hand symbol in `N ∪ T ∪ {ε}`.
    pub fn validate(&self) -> bool {
        self.diagnostics().is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let nonterminals: HashSet<&str> = self.nonterminals.iter().map(String::as_str).collect();
        let terminals: HashSet<&str> = self.terminals.iter().map(String::as_str).collect();
        let mut diagnostics = Vec::new();

        if !nonterminals.contains(self.start.as_str()) {
            diagnostics.push(Diagnostic::StartNotNonterminal(self.start.clone()));
        }

        for (index, production) in self.productions.iter().enumerate() {
            if !nonterminals.contains(production.left.as_str()) {
                diagnostics.push(Diagnostic::LeftNotNonterminal {
                    index,
                    left: production.left.clone(),
                });
            }
            diagnostics.extend(
                production
                    .symbols()
                    .filter(|s| !nonterminals.contains(s) && !terminals.contains(s))
                    .map(|symbol| Diagnostic::UndefinedSymbol {
                        index,
                        symbol: symbol.to_string(),
                    }),
            );
        }

        diagnostics
    }

    /// Structural CNF check: every production is `A → a` or `A → B C`.
    pub fn is_cnf(&self) -> bool {
        self.productions.iter().all(|p| match p.right.as_slice() {
            [a] => self.is_terminal(a),
            [b, c] => self.is_nonterminal(b) && self.is_nonterminal(c),
            _ => false,
        })
    }

    pub fn has_epsilon_productions(&self) -> bool {
        self.productions.iter().any(Production::is_epsilon)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grammar ({}):", self.kind)?;
        writeln!(f, "N = {{{}}}", self.nonterminals.iter().join(", "))?;
        writeln!(f, "T = {{{}}}", self.terminals.iter().join(", "))?;
        writeln!(f, "S = {}", self.start)?;
        write!(f, "P:")?;
        for production in &self.productions {
            let right = if production.right.is_empty() {
                EPSILON.to_string()
            } else {
                production.right.iter().join(" ")
            };
            write!(f, "\n  {} → {}", production.left, right)?;
        }
        Ok(())
    }
}
