/*
    Recognition of regular grammars written as right- or left-linear rules
*/

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use serde::Serialize;
use tracing::{debug, warn};

use crate::grammar::{Grammar, Production, SymbolKind, EPSILON};
use crate::tree::{Child, DerivationTree};

/// Longest chain of unit productions followed before the first token.
pub const MAX_UNIT_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    // A → a B
    Right,
    // A → B a
    Left,
    // Both of the above
    Mixed,
    // Some rule fits neither shape
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DerivationStep {
    Apply { symbol: String, production: Production },
    Diagnostic { message: String },
}

impl DerivationStep {
    fn apply(symbol: &str, production: &Production) -> Self {
        DerivationStep::Apply {
            symbol: symbol.to_string(),
            production: production.clone(),
        }
    }

    fn diagnostic(message: &str) -> Self {
        DerivationStep::Diagnostic {
            message: message.to_string(),
        }
    }

    /// The symbol being rewritten, `Error` for diagnostics.
    pub fn symbol(&self) -> &str {
        match self {
            DerivationStep::Apply { symbol, .. } => symbol,
            DerivationStep::Diagnostic { .. } => "Error",
        }
    }

    pub fn text(&self) -> String {
        match self {
            DerivationStep::Apply { production, .. } => production.to_string(),
            DerivationStep::Diagnostic { message } => message.clone(),
        }
    }
}

impl Display for DerivationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinearParse {
    pub accepted: bool,
    pub direction: Direction,
    /// Productions applied from the start symbol outward. On rejection, the
    /// deepest partial walk.
    pub steps: Vec<DerivationStep>,
}

impl LinearParse {
    /// Steps as `(symbol, production text)` pairs.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.steps.iter().map(|s| (s.symbol().to_string(), s.text())).collect()
    }

    pub fn tree(&self) -> Option<DerivationTree> {
        if !self.accepted {
            return None;
        }
        DerivationTree::from_steps(&self.steps)
    }
}

impl DerivationTree {
    /// Folds a linear derivation log into a tree: the nonterminal each step
    /// introduces is expanded by the step that follows it.
    pub fn from_steps(steps: &[DerivationStep]) -> Option<DerivationTree> {
        let mut applied = Vec::with_capacity(steps.len());
        for step in steps {
            match step {
                DerivationStep::Apply { symbol, production } => applied.push((symbol.as_str(), production)),
                DerivationStep::Diagnostic { .. } => return None,
            }
        }

        let mut tree: Option<DerivationTree> = None;
        for (i, (symbol, production)) in applied.iter().enumerate().rev() {
            let next = applied.get(i + 1).map(|(s, _)| *s);
            let mut pending = tree.take();
            let children = if production.is_epsilon() {
                vec![Child::Leaf(EPSILON.to_string())]
            } else {
                production
                    .symbols()
                    .map(|s| {
                        let expanded = if Some(s) == next { pending.take() } else { None };
                        match expanded {
                            Some(node) => Child::Node(node),
                            None => Child::Leaf(s.to_string()),
                        }
                    })
                    .collect()
            };
            tree = Some(DerivationTree::new(*symbol, children));
        }
        tree
    }
}

/// Classifies the binary productions of a grammar.
///
/// Terminal, unit and epsilon productions fit both directions; a grammar with
/// nothing else defaults to right-linear.
pub fn detect_direction(grammar: &Grammar) -> Direction {
    let mut has_right = false;
    let mut has_left = false;

    for production in &grammar.productions {
        match production.right.as_slice() {
            [] => {}
            [single] => {
                if grammar.classify(single) == SymbolKind::Undefined {
                    return Direction::Invalid;
                }
            }
            [first, second] => match (grammar.classify(first), grammar.classify(second)) {
                (SymbolKind::Terminal, SymbolKind::Nonterminal) => has_right = true,
                (SymbolKind::Nonterminal, SymbolKind::Terminal) => has_left = true,
                _ => return Direction::Invalid,
            },
            _ => return Direction::Invalid,
        }
    }

    match (has_right, has_left) {
        (true, true) => Direction::Mixed,
        (false, true) => Direction::Left,
        _ => Direction::Right,
    }
}

/// True when the grammar is right-linear or left-linear.
pub fn is_regular(grammar: &Grammar) -> bool {
    matches!(detect_direction(grammar), Direction::Right | Direction::Left)
}

// A state on the walk stack and the index of its next production to try
#[derive(Clone, Copy)]
struct Frame<'a> {
    state: &'a str,
    consumed: usize,
    next: usize,
}

enum Arrival {
    Accepted,
    Dead,
    Open,
}

struct Walk<'a> {
    grammar: &'a Grammar,
    tokens: &'a [&'a str],
    direction: Direction,
    rules: HashMap<&'a str, Vec<&'a Production>>,
    path: Vec<DerivationStep>,
    deepest: (usize, Vec<DerivationStep>),
    failed: HashSet<(&'a str, usize)>,
    // Fewest unit hops with which each start state was already tried
    tried_starts: HashMap<&'a str, usize>,
}

impl<'a> Walk<'a> {
    fn new(grammar: &'a Grammar, tokens: &'a [&'a str], direction: Direction) -> Self {
        let mut rules: HashMap<&str, Vec<&Production>> = HashMap::new();
        for production in &grammar.productions {
            rules.entry(production.left.as_str()).or_default().push(production);
        }
        Walk {
            grammar,
            tokens,
            direction,
            rules,
            path: Vec::new(),
            deepest: (0, Vec::new()),
            failed: HashSet::new(),
            tried_starts: HashMap::new(),
        }
    }

    fn production(&self, state: &str, index: usize) -> Option<&'a Production> {
        self.rules.get(state)?.get(index).copied()
    }

    fn epsilon_of(&self, state: &str) -> Option<&'a Production> {
        self.rules.get(state)?.iter().copied().find(|p| p.is_epsilon())
    }

    // Right-linear walks read left to right, left-linear ones right to left
    fn token(&self, consumed: usize) -> &'a str {
        match self.direction {
            Direction::Left => self.tokens[self.tokens.len() - 1 - consumed],
            _ => self.tokens[consumed],
        }
    }

    // (terminal, next state) of a binary production in the walk's direction
    fn step_shape(&self, production: &'a Production) -> Option<(&'a str, &'a str)> {
        let (terminal, next) = match (self.direction, production.right.as_slice()) {
            (Direction::Left, [next, terminal]) => (terminal.as_str(), next.as_str()),
            (Direction::Right, [terminal, next]) => (terminal.as_str(), next.as_str()),
            _ => return None,
        };
        (self.grammar.is_terminal(terminal) && self.grammar.is_nonterminal(next)).then_some((terminal, next))
    }

    fn unit_target(&self, production: &'a Production) -> Option<&'a str> {
        match production.right.as_slice() {
            [next] if self.grammar.is_nonterminal(next) => Some(next.as_str()),
            _ => None,
        }
    }

    fn remember_deepest(&mut self, consumed: usize) {
        if (consumed, self.path.len()) > (self.deepest.0, self.deepest.1.len()) {
            self.deepest = (consumed, self.path.clone());
        }
    }

    // Leading unit chain, at most MAX_UNIT_STEPS hops, then the tokens
    fn start(&mut self, state: &'a str, hops: usize, chain: &mut Vec<&'a str>) -> bool {
        if self.tried_starts.get(state).is_some_and(|&tried| tried <= hops) {
            return false;
        }
        self.tried_starts.insert(state, hops);

        let mut index = 0;
        while let Some(production) = self.production(state, index) {
            index += 1;
            let Some(next) = self.unit_target(production) else {
                continue;
            };
            if hops == MAX_UNIT_STEPS {
                warn!(state, "unit production chain exceeded {} steps", MAX_UNIT_STEPS);
                break;
            }
            if chain.contains(&next) {
                continue;
            }
            self.path.push(DerivationStep::apply(state, production));
            chain.push(next);
            if self.start(next, hops + 1, chain) {
                return true;
            }
            chain.pop();
            self.path.pop();
        }

        self.consume(state)
    }

    fn arrive(&mut self, state: &'a str, consumed: usize) -> Arrival {
        if consumed == self.tokens.len() {
            return if self.finish(state) { Arrival::Accepted } else { Arrival::Dead };
        }
        if !self.failed.insert((state, consumed)) {
            return Arrival::Dead;
        }
        Arrival::Open
    }

    // Depth-first over token steps with an explicit stack, one frame per
    // consumed token
    fn consume(&mut self, from: &'a str) -> bool {
        let mut stack = match self.arrive(from, 0) {
            Arrival::Accepted => return true,
            Arrival::Dead => return false,
            Arrival::Open => vec![Frame { state: from, consumed: 0, next: 0 }],
        };

        while let Some(frame) = stack.last_mut() {
            let Frame { state, consumed, next } = *frame;
            frame.next += 1;

            let Some(production) = self.production(state, next) else {
                self.remember_deepest(consumed);
                stack.pop();
                if !stack.is_empty() {
                    self.path.pop();
                }
                continue;
            };
            let token = self.token(consumed);

            if let [terminal] = production.right.as_slice() {
                // A → a only ends a walk
                if consumed + 1 == self.tokens.len() && terminal == token && self.grammar.is_terminal(terminal) {
                    self.path.push(DerivationStep::apply(state, production));
                    return true;
                }
                continue;
            }
            let Some((terminal, next_state)) = self.step_shape(production) else {
                continue;
            };
            if terminal != token {
                continue;
            }

            self.path.push(DerivationStep::apply(state, production));
            match self.arrive(next_state, consumed + 1) {
                Arrival::Accepted => return true,
                Arrival::Dead => {
                    self.path.pop();
                }
                Arrival::Open => stack.push(Frame {
                    state: next_state,
                    consumed: consumed + 1,
                    next: 0,
                }),
            }
        }
        false
    }

    // All tokens read: the state must vanish directly or after one unit hop
    fn finish(&mut self, state: &'a str) -> bool {
        if let Some(vanish) = self.epsilon_of(state) {
            self.path.push(DerivationStep::apply(state, vanish));
            return true;
        }

        let mut index = 0;
        while let Some(production) = self.production(state, index) {
            index += 1;
            let Some(next) = self.unit_target(production) else {
                continue;
            };
            if let Some(vanish) = self.epsilon_of(next) {
                self.path.push(DerivationStep::apply(state, production));
                self.path.push(DerivationStep::apply(next, vanish));
                return true;
            }
        }

        self.remember_deepest(self.tokens.len());
        false
    }
}

/// Decides membership of `tokens` in a regular grammar.
///
/// Ill-shaped grammars are reported through a rejected parse carrying a
/// single diagnostic step.
pub fn parse<S: AsRef<str>>(grammar: &Grammar, tokens: &[S]) -> LinearParse {
    let direction = detect_direction(grammar);

    if tokens.is_empty() {
        let steps: Vec<DerivationStep> = grammar
            .productions_of(&grammar.start)
            .find(|p| p.is_epsilon())
            .map(|p| DerivationStep::apply(&grammar.start, p))
            .into_iter()
            .collect();
        return LinearParse {
            accepted: !steps.is_empty(),
            direction,
            steps,
        };
    }

    let message = match direction {
        Direction::Invalid => Some("grammar is not regular"),
        Direction::Mixed => Some("mixed left- and right-linear grammars are not supported"),
        _ => None,
    };
    if let Some(message) = message {
        debug!(?direction, "refusing to walk grammar");
        return LinearParse {
            accepted: false,
            direction,
            steps: vec![DerivationStep::diagnostic(message)],
        };
    }

    let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    let mut walk = Walk::new(grammar, &tokens, direction);
    let mut chain = vec![grammar.start.as_str()];
    let accepted = walk.start(&grammar.start, 0, &mut chain);
    debug!(?direction, accepted, tokens = tokens.len(), "walked linear grammar");

    let steps = if accepted { walk.path } else { walk.deepest.1 };
    LinearParse {
        accepted,
        direction,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarKind;

    fn regular(n: &[&str], t: &[&str], p: Vec<Production>) -> Grammar {
        Grammar::new(GrammarKind::Regular, n.to_vec(), t.to_vec(), p, "S")
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn right_linear_walk() {
        let g = regular(
            &["S", "A"],
            &["a", "b"],
            vec![Production::new("S", ["a", "A"]), Production::new("A", ["b"])],
        );
        let result = parse(&g, &["a", "b"]);

        assert!(result.accepted);
        assert_eq!(result.direction, Direction::Right);
        assert_eq!(result.pairs(), pairs(&[("S", "S → aA"), ("A", "A → b")]));
    }

    #[test]
    fn left_linear_walk() {
        let g = regular(
            &["S", "A"],
            &["a", "b"],
            vec![Production::new("S", ["A", "b"]), Production::new("A", ["a"])],
        );
        let result = parse(&g, &["a", "b"]);

        assert!(result.accepted);
        assert_eq!(result.direction, Direction::Left);
        assert_eq!(result.pairs(), pairs(&[("S", "S → Ab"), ("A", "A → a")]));
        assert!(!parse(&g, &["b", "a"]).accepted);
    }

    #[test]
    fn single_terminal_only_ends_the_input() {
        let g = regular(
            &["S", "A"],
            &["a", "b"],
            vec![
                Production::new("S", ["a", "A"]),
                Production::new("A", ["b"]),
                Production::new("S", ["b"]),
            ],
        );
        assert!(parse(&g, &["b"]).accepted);
        assert!(!parse(&g, &["b", "b"]).accepted);
    }

    #[test]
    fn rejection_keeps_partial_log() {
        let g = regular(
            &["S", "A"],
            &["a", "b"],
            vec![Production::new("S", ["a", "A"]), Production::new("A", ["b"])],
        );
        let result = parse(&g, &["a", "a"]);

        assert!(!result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → aA")]));
        assert_eq!(result.tree(), None);
    }

    #[test]
    fn empty_input_needs_direct_epsilon() {
        let with = regular(&["S"], &["a"], vec![Production::epsilon("S")]);
        let result = parse::<&str>(&with, &[]);
        assert!(result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → ε")]));

        let without = regular(&["S"], &["a"], vec![Production::new("S", ["a"])]);
        assert!(!parse::<&str>(&without, &[]).accepted);
    }

    #[test]
    fn trailing_epsilon_directly_or_through_one_unit() {
        let g = regular(
            &["S", "A", "F"],
            &["a"],
            vec![
                Production::new("S", ["a", "A"]),
                Production::new("A", ["F"]),
                Production::new("F", ["ε"]),
            ],
        );
        let result = parse(&g, &["a"]);
        assert!(result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → aA"), ("A", "A → F"), ("F", "F → ε")]));
    }

    #[test]
    fn leading_unit_chain_is_followed() {
        let g = regular(
            &["S", "A", "B"],
            &["a"],
            vec![
                Production::new("S", ["A"]),
                Production::new("A", ["B"]),
                Production::new("B", ["a"]),
            ],
        );
        let result = parse(&g, &["a"]);
        assert!(result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → A"), ("A", "A → B"), ("B", "B → a")]));
    }

    #[test]
    fn cyclic_units_terminate() {
        let g = regular(
            &["S", "A"],
            &["a"],
            vec![
                Production::new("S", ["A"]),
                Production::new("A", ["S"]),
                Production::new("A", ["a"]),
            ],
        );
        assert!(parse(&g, &["a"]).accepted);
        assert!(!parse(&g, &["a", "a"]).accepted);
    }

    #[test]
    fn token_steps_do_not_follow_units() {
        let g = regular(
            &["S", "A", "B"],
            &["a", "b"],
            vec![
                Production::new("S", ["a", "A"]),
                Production::new("A", ["B"]),
                Production::new("B", ["b"]),
            ],
        );
        let result = parse(&g, &["a", "b"]);
        assert!(!result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → aA")]));
    }

    #[test]
    fn trailing_epsilon_is_at_most_one_unit_away() {
        let g = regular(
            &["S", "A", "B", "C"],
            &["a"],
            vec![
                Production::new("S", ["a", "A"]),
                Production::new("A", ["B"]),
                Production::new("B", ["C"]),
                Production::epsilon("C"),
            ],
        );
        assert!(!parse(&g, &["a"]).accepted);
    }

    fn unit_chain(length: usize) -> Grammar {
        let names: Vec<String> = std::iter::once("S".to_string())
            .chain((1..=length).map(|i| format!("N{i}")))
            .collect();
        let mut productions: Vec<Production> = names.windows(2).map(|w| Production::new(w[0].clone(), [w[1].clone()])).collect();
        productions.push(Production::new(names[length].clone(), ["a"]));
        Grammar::new(GrammarKind::Regular, names, ["a"], productions, "S")
    }

    #[test]
    fn leading_unit_chain_is_capped() {
        let within = parse(&unit_chain(MAX_UNIT_STEPS), &["a"]);
        assert!(within.accepted);
        assert_eq!(within.steps.len(), MAX_UNIT_STEPS + 1);

        assert!(!parse(&unit_chain(MAX_UNIT_STEPS + 50), &["a"]).accepted);
    }

    #[test]
    fn long_inputs_walk_without_recursion() {
        let n = 100_000;
        let right = regular(&["S"], &["a"], vec![Production::new("S", ["a", "S"]), Production::epsilon("S")]);
        let result = parse(&right, &vec!["a"; n]);
        assert!(result.accepted);
        assert_eq!(result.steps.len(), n + 1);
        assert_eq!(result.tree().unwrap().leaves().len(), n);

        let left = regular(&["S"], &["a", "b"], vec![Production::new("S", ["S", "a"]), Production::new("S", ["b"])]);
        let mut tokens = vec!["a"; n];
        tokens[0] = "b";
        assert!(parse(&left, &tokens).accepted);
        tokens[1] = "b";
        assert!(!parse(&left, &tokens).accepted);
    }

    #[test]
    fn nondeterministic_choices_are_backtracked() {
        let g = regular(
            &["S", "A", "B"],
            &["a", "b", "c"],
            vec![
                Production::new("S", ["a", "A"]),
                Production::new("S", ["a", "B"]),
                Production::new("A", ["b"]),
                Production::new("B", ["c"]),
            ],
        );
        let result = parse(&g, &["a", "c"]);
        assert!(result.accepted);
        assert_eq!(result.pairs(), pairs(&[("S", "S → aB"), ("B", "B → c")]));
    }

    #[test]
    fn direction_detection() {
        let right = regular(&["S"], &["a"], vec![Production::new("S", ["a", "S"])]);
        let left = regular(&["S"], &["a"], vec![Production::new("S", ["S", "a"])]);
        let mixed = regular(
            &["S"],
            &["a"],
            vec![Production::new("S", ["a", "S"]), Production::new("S", ["S", "a"])],
        );
        let plain = regular(&["S"], &["a"], vec![Production::new("S", ["a"]), Production::epsilon("S")]);
        let long = regular(&["S"], &["a", "b"], vec![Production::new("S", ["a", "b", "a"])]);

        assert_eq!(detect_direction(&right), Direction::Right);
        assert_eq!(detect_direction(&left), Direction::Left);
        assert_eq!(detect_direction(&mixed), Direction::Mixed);
        assert_eq!(detect_direction(&plain), Direction::Right);
        assert_eq!(detect_direction(&long), Direction::Invalid);
        assert!(is_regular(&left) && is_regular(&plain));
        assert!(!is_regular(&mixed) && !is_regular(&long));
    }

    #[test]
    fn mixed_grammar_is_rejected_with_diagnostic() {
        let mixed = regular(
            &["S", "A"],
            &["a"],
            vec![Production::new("S", ["a", "A"]), Production::new("A", ["S", "a"])],
        );
        let result = parse(&mixed, &["a"]);
        assert!(!result.accepted);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].symbol(), "Error");
    }

    #[test]
    fn steps_fold_into_tree() {
        let g = regular(
            &["S", "A"],
            &["a", "b"],
            vec![Production::new("S", ["A", "b"]), Production::new("A", ["a"])],
        );
        let tree = parse(&g, &["a", "b"]).tree().unwrap();
        assert_eq!(tree.to_text(), "S\n A\n  a\n b\n");
        assert_eq!(tree.leaves(), vec!["a", "b"]);
    }
}
