/*
    Conversion of epsilon-free context-free grammars to Chomsky Normal Form
*/

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::debug;

use super::{Grammar, Production};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    // Epsilon removal is not part of the conversion
    #[error("`{left} → ε` is an epsilon production; CNF conversion needs an epsilon-free grammar")]
    EpsilonProduction { left: String },
}

// Mints nonterminal names that collide with nothing in the grammar. Lives for
// exactly one conversion.
struct NameSupply {
    taken: HashSet<String>,
}

impl NameSupply {
    fn new(grammar: &Grammar) -> Self {
        let taken = grammar
            .nonterminals
            .iter()
            .chain(grammar.terminals.iter())
            .chain(grammar.productions.iter().flat_map(|p| std::iter::once(&p.left).chain(p.right.iter())))
            .cloned()
            .collect();
        NameSupply { taken }
    }

    fn fresh(&mut self, stem: &str) -> String {
        if self.taken.insert(stem.to_string()) {
            return stem.to_string();
        }
        (2..)
            .map(|n| format!("{}{}", stem, n))
            .find(|name| self.taken.insert(name.clone()))
            .unwrap_or_default()
    }
}

struct Normalizer {
    names: NameSupply,
    nonterminals: Vec<String>,
    productions: Vec<Production>,
}

impl Normalizer {
    fn is_nonterminal(&self, symbol: &str) -> bool {
        self.nonterminals.iter().any(|n| n == symbol)
    }

    fn add_nonterminal(&mut self, stem: &str) -> String {
        let name = self.names.fresh(stem);
        self.nonterminals.push(name.clone());
        name
    }

    // A → x a y  ==>  A → x T_a y, T_a → a
    fn isolate_terminals(&mut self) {
        let mut substitutes: HashMap<String, String> = HashMap::new();
        let mut added = Vec::new();
        let productions = std::mem::take(&mut self.productions);

        for production in productions {
            if production.right.len() < 2 {
                self.productions.push(production);
                continue;
            }
            let mut right = Vec::with_capacity(production.right.len());
            for symbol in production.right {
                if self.is_nonterminal(&symbol) {
                    right.push(symbol);
                    continue;
                }
                let substitute = match substitutes.get(&symbol) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.add_nonterminal(&format!("T_{}", symbol));
                        substitutes.insert(symbol.clone(), name.clone());
                        added.push(Production::new(name.clone(), [symbol]));
                        name
                    }
                };
                right.push(substitute);
            }
            self.productions.push(Production {
                left: production.left,
                right,
            });
        }

        debug!(terminals = added.len(), "isolated terminals");
        self.productions.extend(added);
    }

    // A → B1 B2 ... Bk  ==>  A → B1 A_1, A_1 → B2 A_2, ..., A_k-2 → Bk-1 Bk
    fn binarize(&mut self) {
        let productions = std::mem::take(&mut self.productions);
        let mut chains = 0;

        for production in productions {
            if production.right.len() <= 2 {
                self.productions.push(production);
                continue;
            }
            let Production { left, right } = production;
            let last = right.len() - 2;
            let mut head = left.clone();
            for (i, symbol) in right[..last].iter().enumerate() {
                let tail = self.add_nonterminal(&format!("{}_{}", left, i + 1));
                self.productions.push(Production::new(head, [symbol.clone(), tail.clone()]));
                head = tail;
            }
            self.productions.push(Production::new(head, right[last..].iter().cloned()));
            chains += 1;
        }

        debug!(chains, "binarized long productions");
    }

    fn is_unit<'p>(&self, production: &'p Production) -> Option<&'p str> {
        match production.right.as_slice() {
            [single] if self.is_nonterminal(single) => Some(single),
            _ => None,
        }
    }

    // Each nonterminal takes over the non-unit productions of everything it
    // reaches through unit productions
    fn eliminate_unit_rules(&mut self) {
        let mut result = Vec::new();
        let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();

        for nonterminal in &self.nonterminals {
            let mut visited: HashSet<&str> = HashSet::new();
            let mut queue = VecDeque::from([nonterminal.as_str()]);

            while let Some(current) = queue.pop_front() {
                if !visited.insert(current) {
                    continue;
                }
                for production in self.productions.iter().filter(|p| p.left == current) {
                    match self.is_unit(production) {
                        Some(target) => queue.push_back(target),
                        None => {
                            if seen.insert((nonterminal.clone(), production.right.clone())) {
                                result.push(Production::new(nonterminal.clone(), production.right.iter().cloned()));
                            }
                        }
                    }
                }
            }
        }

        debug!(before = self.productions.len(), after = result.len(), "eliminated unit productions");
        self.productions = result;
    }
}

/// Produces an equivalent grammar in Chomsky Normal Form.
///
/// The input is left untouched; fresh nonterminals are appended to `N` in the
/// order they are created. Fails when the grammar has an epsilon production.
pub fn normalize(grammar: &Grammar) -> Result<Grammar, FormatError> {
    if let Some(production) = grammar.productions.iter().find(|p| p.is_epsilon()) {
        return Err(FormatError::EpsilonProduction {
            left: production.left.clone(),
        });
    }

    let mut normalizer = Normalizer {
        names: NameSupply::new(grammar),
        nonterminals: grammar.nonterminals.clone(),
        productions: grammar
            .productions
            .iter()
            .map(|p| Production::new(p.left.clone(), p.symbols()))
            .collect(),
    };
    for production in &grammar.productions {
        if !normalizer.is_nonterminal(&production.left) {
            normalizer.nonterminals.push(production.left.clone());
        }
    }

    normalizer.isolate_terminals();
    normalizer.binarize();
    normalizer.eliminate_unit_rules();

    Ok(Grammar {
        kind: grammar.kind,
        nonterminals: normalizer.nonterminals,
        terminals: grammar.terminals.clone(),
        productions: normalizer.productions,
        start: grammar.start.clone(),
    })
}
