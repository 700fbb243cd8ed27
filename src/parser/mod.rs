/*
    This module reads grammars written in the plain-text notation and
    dispatches grammar files to the right loader
*/

mod lexer;
mod verifier;

use std::fs;
use std::path::Path;

use itertools::Itertools;
use tracing::debug;

use crate::error_handling::*;
use crate::grammar::*;
use lexer::*;
use verifier::verify_rules;

#[derive(Debug, thiserror::Error)]
pub enum CompileErrorType {
    // A line which should contain a rule does not
    #[error("Expected `=` after nonterminal")]
    MissingEquals,
    // A rule has multiple equals signs
    #[error("Unexpected `=` encountered")]
    UnexpectedEquals,
    // The rule line starts with something other than a nonterminal
    #[error("Tried to define something other than a nonterminal")]
    MissingNonterminal,
    #[error("Unmatched quotes")]
    UnmatchedQuote,
    #[error("Could not find definition for `{0}`")]
    UndefinedNonterminal(String),
    // A full rewrite reached the alternative parser unsplit
    #[error("Rewrite was not fully split (this is a problem with grammatica, not the grammar)")]
    UnsplitRewrite,
    // A blank line reached the rule parser
    #[error("Blank line encountered in rule parser (this is a problem with grammatica, not the grammar)")]
    UnexpectedBlankLine,
    #[error("File error: {0}")]
    FileError(std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompileErrorType::FileError(a), CompileErrorType::FileError(b)) => a.kind() == b.kind(),
            (CompileErrorType::UndefinedNonterminal(a), CompileErrorType::UndefinedNonterminal(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;
pub type CompileErrors = Errors<CompileErrorType>;

fn io_error(error: std::io::Error, file: &Path) -> CompileError {
    CompileError::at(Location::file(file), CompileErrorType::FileError(error))
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileErrors>;

#[derive(PartialEq, Debug)]
struct Rule {
    symbol: String,
    rewrite: Rewrite,
    location: Location,
}

fn parse_alternative(tokens: &[Token]) -> Result<Alternative> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Equals => Some(Err(CompileErrorType::UnexpectedEquals)),
            Token::Or => Some(Err(CompileErrorType::UnsplitRewrite)),
            Token::Nonterminal(s) => Some(Ok(Symbol::Nonterminal(s.clone()))),
            Token::Terminal(s) => Some(Ok(Symbol::Terminal(s.clone()))),
            // Epsilon contributes no symbols
            Token::Epsilon => None,
        })
        .collect()
}

fn parse_rewrite(tokens: &[Token]) -> Result<Rewrite> {
    tokens.split(|t| *t == Token::Or).map(parse_alternative).collect()
}

fn parse_line(tokens: &[Token], location: Location) -> Result<Rule> {
    let symbol = match tokens.first() {
        Some(Token::Nonterminal(s)) => Ok(s.clone()),
        Some(_) => Err(CompileErrorType::MissingNonterminal),
        None => Err(CompileErrorType::UnexpectedBlankLine),
    }?;

    if tokens.get(1) != Some(&Token::Equals) {
        return Err(CompileErrorType::MissingEquals);
    }

    let rewrite = parse_rewrite(&tokens[2..])?;

    Ok(Rule { symbol, rewrite, location })
}

fn parse_lex_line(line: &str, location: Location) -> LineResult<Rule> {
    lexer::lex_line(line)
        .and_then(|lexed_line| parse_line(&lexed_line, location.clone()))
        .map_err(|error| CompileError::at(location, error))
}

fn is_rule_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with(';')
}

// Rule lines of the text with their 1-based line numbers
fn rule_line_nums(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| is_rule_line(line))
        .map(|(num, line)| (num + 1, line))
}

fn symbol_text(symbol: Symbol) -> String {
    match symbol {
        Symbol::Terminal(s) | Symbol::Nonterminal(s) => s,
    }
}

fn grammar_from_rules(rules: Vec<Rule>, kind: GrammarKind) -> FileResult<Grammar> {
    verify_rules(&rules)?;

    let start = rules.first().map(|rule| rule.symbol.clone()).unwrap_or_default();
    let nonterminals = rules.iter().map(|rule| rule.symbol.clone()).unique().collect_vec();
    let terminals = rules
        .iter()
        .flat_map(|rule| rule.rewrite.iter().flatten())
        .filter_map(|symbol| match symbol {
            Symbol::Terminal(s) => Some(s.clone()),
            Symbol::Nonterminal(_) => None,
        })
        .unique()
        .collect_vec();
    let productions = rules
        .into_iter()
        .flat_map(|rule| {
            let symbol = rule.symbol;
            rule.rewrite
                .into_iter()
                .map(move |alternative| Production::new(symbol.clone(), alternative.into_iter().map(symbol_text)))
        })
        .collect_vec();

    Ok(Grammar::new(kind, nonterminals, terminals, productions, start))
}

/// Parses notation text. `path` only labels error locations.
pub fn parse_str(text: &str, kind: GrammarKind, path: &Path) -> FileResult<Grammar> {
    let parsed_lines = rule_line_nums(text).map(|(num, line)| parse_lex_line(line, Location::line(path, num)));

    let (rules, errors): (Vec<_>, Vec<_>) = parsed_lines.partition_result();
    if !errors.is_empty() {
        return Err(errors);
    }

    debug!(rules = rules.len(), file = %path.display(), "parsed grammar notation");
    grammar_from_rules(rules, kind)
}

pub fn parse_file(path: &Path, kind: GrammarKind) -> FileResult<Grammar> {
    let text = fs::read_to_string(path).map_err(|e| vec![io_error(e, path)])?;
    parse_str(&text, kind, path)
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}: {1}")]
    Document(String, DocumentError),
    #[error("{}", .0.iter().join("\n"))]
    Notation(CompileErrors),
}

/// Loads `.json` files as grammar documents and anything else as notation.
///
/// `kind` overrides the kind stored in a document; notation files default to
/// context-free.
pub fn load_grammar(path: &Path, kind: Option<GrammarKind>) -> std::result::Result<Grammar, LoadError> {
    let is_document = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_document {
        let grammar = Grammar::load(path).map_err(|e| LoadError::Document(path.display().to_string(), e))?;
        Ok(match kind {
            Some(kind) => grammar.with_kind(kind),
            None => grammar,
        })
    } else {
        parse_file(path, kind.unwrap_or_default()).map_err(LoadError::Notation)
    }
}
