/*
    Membership tests, picked by the declared kind of the grammar
*/

pub mod cyk;
pub mod linear;

use crate::grammar::cnf::FormatError;
use crate::grammar::{Grammar, GrammarKind};
use crate::tree::DerivationTree;

use cyk::CykOutcome;
use linear::LinearParse;

#[derive(Debug, Clone)]
pub enum Recognition {
    Cyk(CykOutcome),
    Linear(LinearParse),
}

impl Recognition {
    pub fn accepted(&self) -> bool {
        match self {
            Recognition::Cyk(outcome) => outcome.accepted,
            Recognition::Linear(parse) => parse.accepted,
        }
    }

    pub fn tree(&self) -> Option<DerivationTree> {
        match self {
            Recognition::Cyk(outcome) => outcome.tree(),
            Recognition::Linear(parse) => parse.tree(),
        }
    }
}

/// CYK for context-free grammars, the linear walk for regular ones.
pub fn recognize<S: AsRef<str>>(grammar: &Grammar, tokens: &[S]) -> Result<Recognition, FormatError> {
    match grammar.kind {
        GrammarKind::ContextFree => cyk::parse(grammar, tokens).map(Recognition::Cyk),
        GrammarKind::Regular => Ok(Recognition::Linear(linear::parse(grammar, tokens))),
    }
}
