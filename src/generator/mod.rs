/*
    This module generates the strings of a grammar
*/

pub mod sample;

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::grammar::{is_epsilon_marker, Grammar};

pub use sample::Sampler;

/// Strings returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 10;

/// Longest sentential form explored when no bound is given.
pub const DEFAULT_MAX_DEPTH: usize = 12;

/// Breadth-first enumeration of the shortest strings of `grammar`.
///
/// Explores leftmost derivations from the start symbol, discarding sentential
/// forms with more than `max_depth` symbols. Returns at most `limit` distinct
/// strings; fewer (possibly none) when the bounded search runs dry.
pub fn generate(grammar: &Grammar, limit: usize, max_depth: usize) -> Vec<String> {
    let mut results: Vec<String> = Vec::new();
    let mut emitted: HashSet<String> = HashSet::new();

    let start = vec![grammar.start.as_str()];
    let mut visited: HashSet<Vec<&str>> = HashSet::from([start.clone()]);
    let mut queue = VecDeque::from([start]);

    while results.len() < limit {
        let Some(form) = queue.pop_front() else {
            break;
        };
        let symbols: Vec<&str> = form.iter().copied().filter(|s| !is_epsilon_marker(s)).collect();

        // Fully terminal, emit and stop expanding
        if symbols.iter().all(|s| !grammar.is_nonterminal(s)) {
            let string = symbols.concat();
            if emitted.insert(string.clone()) {
                results.push(string);
            }
            continue;
        }

        if symbols.len() > max_depth {
            continue;
        }

        let Some(index) = form.iter().position(|s| grammar.is_nonterminal(s)) else {
            continue;
        };
        for production in grammar.productions_of(form[index]) {
            let mut next = Vec::with_capacity(form.len() + production.right.len());
            next.extend_from_slice(&form[..index]);
            next.extend(production.right.iter().map(String::as_str));
            next.extend_from_slice(&form[index + 1..]);
            if visited.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    debug!(found = results.len(), explored = visited.len(), "generated strings");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarKind, Production};

    fn grammar(n: &[&str], t: &[&str], p: Vec<Production>) -> Grammar {
        Grammar::new(GrammarKind::ContextFree, n.to_vec(), t.to_vec(), p, "S")
    }

    fn a_star_b() -> Grammar {
        grammar(&["S"], &["a", "b"], vec![Production::new("S", ["a", "S"]), Production::new("S", ["b"])])
    }

    #[test]
    fn shortest_strings_in_breadth_first_order() {
        assert_eq!(generate(&a_star_b(), 3, 4), vec!["b", "ab", "aab"]);
    }

    #[test]
    fn limit_zero_yields_nothing() {
        assert!(generate(&a_star_b(), 0, 10).is_empty());
    }

    #[test]
    fn finite_language_is_exhausted() {
        let g = grammar(
            &["S"],
            &["a", "b", "c"],
            vec![Production::new("S", ["a"]), Production::new("S", ["b"]), Production::new("S", ["c"])],
        );
        assert_eq!(generate(&g, 1000, 10), vec!["a", "b", "c"]);
    }

    #[test]
    fn epsilon_is_filtered_out_of_forms() {
        // S → ( S ) S | ε
        let g = grammar(
            &["S"],
            &["(", ")"],
            vec![Production::new("S", ["(", "S", ")", "S"]), Production::epsilon("S")],
        );
        let out = generate(&g, 4, 8);
        assert_eq!(out[0], "");
        assert!(out.contains(&"()".to_string()));
    }

    #[test]
    fn epsilon_markers_count_as_empty() {
        let g = grammar(&["S"], &["a"], vec![Production::new("S", ["a", "S"]), Production::new("S", ["ε"])]);
        assert_eq!(generate(&g, 3, 5), vec!["", "a", "aa"]);
    }

    #[test]
    fn depth_bounds_form_length() {
        let out = generate(&a_star_b(), 100, 2);
        assert!(out.iter().all(|s| s.len() <= 3));
        assert!(generate(&a_star_b(), 100, 5).len() > out.len());
    }

    #[test]
    fn non_terminating_grammar_yields_nothing() {
        let g = grammar(&["S"], &["a"], vec![Production::new("S", ["a", "S"])]);
        assert!(generate(&g, 5, 4).is_empty());
    }

    #[test]
    fn no_duplicates_and_deterministic() {
        // ambiguous: S → S S | a
        let g = grammar(&["S"], &["a"], vec![Production::new("S", ["S", "S"]), Production::new("S", ["a"])]);
        let out = generate(&g, 10, 6);
        let unique: HashSet<&String> = out.iter().collect();

        assert_eq!(unique.len(), out.len());
        assert_eq!(out, generate(&g, 10, 6));
    }
}
