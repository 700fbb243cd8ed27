/*
    CYK membership test over Chomsky Normal Form grammars
*/

use std::collections::HashMap;

use tracing::debug;

use crate::grammar::cnf::{normalize, FormatError};
use crate::grammar::Grammar;
use crate::tree::{Child, DerivationTree};

/// How a nonterminal came to derive a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackPointer {
    // A → token
    Terminal(String),
    // A → B C, with B over the first `split` tokens of the span
    Split { split: usize, left: String, right: String },
}

/// Chart cells for every `(start, length)` span, each entry carrying the
/// back pointer recorded when the nonterminal first entered the cell.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    len: usize,
    cells: Vec<Vec<Vec<(String, BackPointer)>>>,
}

impl Chart {
    fn new(len: usize) -> Self {
        Chart {
            len,
            cells: vec![vec![Vec::new(); len + 1]; len],
        }
    }

    /// Number of tokens the chart spans.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entries(&self, start: usize, length: usize) -> &[(String, BackPointer)] {
        self.cells
            .get(start)
            .and_then(|row| row.get(length))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nonterminals deriving `tokens[start..start + length]`, in discovery order.
    pub fn cell(&self, start: usize, length: usize) -> impl Iterator<Item = &str> {
        self.entries(start, length).iter().map(|(symbol, _)| symbol.as_str())
    }

    pub fn contains(&self, start: usize, length: usize, symbol: &str) -> bool {
        self.back_pointer(start, length, symbol).is_some()
    }

    pub fn back_pointer(&self, start: usize, length: usize, symbol: &str) -> Option<&BackPointer> {
        self.entries(start, length)
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, back)| back)
    }

    /// Total number of recorded back pointers.
    pub fn back_pointer_count(&self) -> usize {
        self.cells.iter().flatten().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone)]
pub struct CykOutcome {
    pub accepted: bool,
    pub chart: Chart,
    /// The CNF grammar the chart was built with
    pub grammar: Grammar,
}

impl CykOutcome {
    /// Derivation of the whole input, for accepted parses.
    pub fn tree(&self) -> Option<DerivationTree> {
        if !self.accepted {
            return None;
        }
        reconstruct(&self.chart, 0, self.chart.len(), &self.grammar.start)
    }
}

/// Runs CYK on `tokens`, converting the grammar to CNF first when needed.
///
/// The empty input is always rejected. Conversion failure is reported as an
/// error rather than a rejection.
pub fn parse<S: AsRef<str>>(grammar: &Grammar, tokens: &[S]) -> Result<CykOutcome, FormatError> {
    let grammar = if grammar.is_cnf() {
        grammar.clone()
    } else {
        debug!("grammar is not in CNF, normalizing");
        normalize(grammar)?
    };

    let n = tokens.len();
    let mut chart = Chart::new(n);
    if n == 0 {
        return Ok(CykOutcome {
            accepted: false,
            chart,
            grammar,
        });
    }

    let mut by_terminal: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut by_pair: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
    for production in &grammar.productions {
        let lefts = match production.right.as_slice() {
            [a] if grammar.is_terminal(a) => by_terminal.entry(a.as_str()).or_default(),
            [b, c] => by_pair.entry((b.as_str(), c.as_str())).or_default(),
            _ => continue,
        };
        if !lefts.contains(&production.left.as_str()) {
            lefts.push(&production.left);
        }
    }

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        if let Some(lefts) = by_terminal.get(token) {
            chart.cells[i][1] = lefts
                .iter()
                .map(|a| (a.to_string(), BackPointer::Terminal(token.to_string())))
                .collect();
        }
    }

    for length in 2..=n {
        for start in 0..=n - length {
            let mut found: Vec<(String, BackPointer)> = Vec::new();
            for split in 1..length {
                for (b, _) in chart.entries(start, split) {
                    for (c, _) in chart.entries(start + split, length - split) {
                        let Some(lefts) = by_pair.get(&(b.as_str(), c.as_str())) else {
                            continue;
                        };
                        for a in lefts {
                            if found.iter().all(|(s, _)| s != a) {
                                found.push((
                                    a.to_string(),
                                    BackPointer::Split {
                                        split,
                                        left: b.clone(),
                                        right: c.clone(),
                                    },
                                ));
                            }
                        }
                    }
                }
            }
            chart.cells[start][length] = found;
        }
    }

    let accepted = chart.contains(0, n, &grammar.start);
    debug!(tokens = n, entries = chart.back_pointer_count(), accepted, "filled CYK chart");

    Ok(CykOutcome {
        accepted,
        chart,
        grammar,
    })
}

/// Follows back pointers from `symbol` over `tokens[start..start + length]`.
///
/// `None` when `symbol` does not derive that span.
pub fn reconstruct(chart: &Chart, start: usize, length: usize, symbol: &str) -> Option<DerivationTree> {
    match chart.back_pointer(start, length, symbol)? {
        BackPointer::Terminal(token) => Some(DerivationTree::terminal(symbol, token.clone())),
        BackPointer::Split { split, left, right } => {
            let left_tree = reconstruct(chart, start, *split, left)?;
            let right_tree = reconstruct(chart, start + split, length - split, right)?;
            Some(DerivationTree::new(
                symbol,
                vec![Child::Node(left_tree), Child::Node(right_tree)],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarKind, Production};

    fn ab_grammar() -> Grammar {
        Grammar::new(
            GrammarKind::ContextFree,
            ["S", "A", "B"],
            ["a", "b"],
            vec![
                Production::new("S", ["A", "B"]),
                Production::new("A", ["a"]),
                Production::new("B", ["b"]),
            ],
            "S",
        )
    }

    #[test]
    fn accepts_and_rebuilds_tree() {
        let outcome = parse(&ab_grammar(), &["a", "b"]).unwrap();
        assert!(outcome.accepted);

        let expected = DerivationTree::new(
            "S",
            vec![
                Child::Node(DerivationTree::terminal("A", "a")),
                Child::Node(DerivationTree::terminal("B", "b")),
            ],
        );
        assert_eq!(outcome.tree(), Some(expected));
    }

    #[test]
    fn rejects_string_outside_language() {
        let outcome = parse(&ab_grammar(), &["a", "a"]).unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.tree(), None);
    }

    #[test]
    fn empty_input_is_rejected() {
        let outcome = parse::<&str>(&ab_grammar(), &[]).unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.chart.is_empty());
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!(!parse(&ab_grammar(), &["a", "z"]).unwrap().accepted);
    }

    #[test]
    fn back_pointers_are_recorded() {
        let g = Grammar::new(
            GrammarKind::ContextFree,
            ["S", "A"],
            ["a"],
            vec![Production::new("S", ["A", "A"]), Production::new("A", ["a"])],
            "S",
        );
        let outcome = parse(&g, &["a", "a"]).unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.chart.back_pointer_count(), 3);
        assert_eq!(
            outcome.chart.back_pointer(0, 2, "S"),
            Some(&BackPointer::Split {
                split: 1,
                left: "A".to_string(),
                right: "A".to_string()
            })
        );
    }

    #[test]
    fn unit_rule_grammar_is_normalized_first() {
        let g = Grammar::new(
            GrammarKind::ContextFree,
            ["S", "A"],
            ["a"],
            vec![Production::new("S", ["A"]), Production::new("A", ["a"])],
            "S",
        );
        let outcome = parse(&g, &["a"]).unwrap();

        assert!(outcome.accepted);
        assert_eq!(outcome.tree(), Some(DerivationTree::terminal("S", "a")));
        assert!(outcome.grammar.productions.contains(&Production::new("S", ["a"])));
    }

    #[test]
    fn epsilon_grammar_fails_instead_of_rejecting() {
        let g = Grammar::new(
            GrammarKind::ContextFree,
            ["S"],
            ["a"],
            vec![Production::new("S", ["a", "S"]), Production::epsilon("S")],
            "S",
        );
        assert!(matches!(parse(&g, &["a"]), Err(FormatError::EpsilonProduction { .. })));
    }

    #[test]
    fn ties_keep_first_split() {
        let g = Grammar::new(
            GrammarKind::ContextFree,
            ["S"],
            ["a"],
            vec![Production::new("S", ["S", "S"]), Production::new("S", ["a"])],
            "S",
        );
        let outcome = parse(&g, &["a", "a", "a"]).unwrap();
        assert!(matches!(outcome.chart.back_pointer(0, 3, "S"), Some(BackPointer::Split { split: 1, .. })));

        let tree = outcome.tree().unwrap();
        assert_eq!(tree.leaves(), vec!["a", "a", "a"]);
        assert_eq!(tree.to_text(), "S\n S\n  a\n S\n  S\n   a\n  S\n   a\n");
    }

    #[test]
    fn long_productions_parse_through_conversion() {
        // S → ( S ) | ( )
        let g = Grammar::new(
            GrammarKind::ContextFree,
            ["S"],
            ["(", ")"],
            vec![Production::new("S", ["(", "S", ")"]), Production::new("S", ["(", ")"])],
            "S",
        );
        let tokens = ["(", "(", ")", ")"];
        let outcome = parse(&g, &tokens).unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.tree().unwrap().leaves(), tokens);
        assert!(!parse(&g, &["(", ")", ")"]).unwrap().accepted);
    }

    #[test]
    fn reconstruct_missing_symbol_is_none() {
        let outcome = parse(&ab_grammar(), &["a", "b"]).unwrap();
        assert_eq!(reconstruct(&outcome.chart, 0, 2, "A"), None);
        assert_eq!(reconstruct(&outcome.chart, 5, 1, "A"), None);
        assert_eq!(outcome.chart.cell(0, 1).collect::<Vec<_>>(), vec!["A"]);
    }
}
