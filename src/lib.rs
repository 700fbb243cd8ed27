//! Formal grammar analysis: a grammar model with JSON documents and a plain
//! text notation, Chomsky normal form conversion, CYK and linear-grammar
//! recognizers with derivation trees, and string generation.

pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod parser;
pub mod recognizer;
pub mod tree;

pub use generator::{generate, Sampler};
pub use grammar::cnf::{normalize, FormatError};
pub use grammar::{Grammar, GrammarKind, Production};
pub use parser::load_grammar;
pub use recognizer::{recognize, Recognition};
pub use tree::DerivationTree;
