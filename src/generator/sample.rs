use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::trace;

use crate::grammar::{is_epsilon_marker, Grammar, Production};

/// Attempts spent per requested string before `sample_many` gives up.
pub const SAMPLE_ATTEMPTS_PER_STRING: usize = 64;

// Rewrites allowed in one derivation; stops unit cycles from spinning
const MAX_REWRITES: usize = 10_000;

/// Random leftmost derivations, choosing among alternatives uniformly.
pub struct Sampler<R: Rng = StdRng> {
    rng: R,
}

impl Sampler<StdRng> {
    /// Reproducible with a seed, entropy-seeded without one.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Sampler { rng }
    }
}

impl<R: Rng> Sampler<R> {
    pub fn with_rng(rng: R) -> Self {
        Sampler { rng }
    }

    /// One random string, or `None` when the derivation outgrew `max_depth`
    /// symbols or reached a nonterminal without productions.
    pub fn sample(&mut self, grammar: &Grammar, max_depth: usize) -> Option<String> {
        let mut form: Vec<&str> = vec![grammar.start.as_str()];

        for _ in 0..MAX_REWRITES {
            let Some(index) = form.iter().position(|s| grammar.is_nonterminal(s)) else {
                return Some(form.concat());
            };
            let alternatives: Vec<&Production> = grammar.productions_of(form[index]).collect();
            let Some(production) = alternatives.choose(&mut self.rng) else {
                trace!(symbol = form[index], "no production to expand");
                return None;
            };
            let rest = form.split_off(index + 1);
            form.pop();
            form.extend(production.right.iter().map(String::as_str).filter(|s| !is_epsilon_marker(s)));
            form.extend(rest);
            if form.len() > max_depth {
                trace!(len = form.len(), "sentential form outgrew bound");
                return None;
            }
        }
        None
    }

    /// Up to `amount` random strings; duplicates are kept.
    pub fn sample_many(&mut self, grammar: &Grammar, amount: usize, max_depth: usize) -> Vec<String> {
        let mut results = Vec::with_capacity(amount);
        for _ in 0..amount.saturating_mul(SAMPLE_ATTEMPTS_PER_STRING) {
            if results.len() == amount {
                break;
            }
            if let Some(string) = self.sample(grammar, max_depth) {
                results.push(string);
            }
        }
        results
    }
}
