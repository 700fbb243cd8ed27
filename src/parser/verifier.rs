use std::collections::HashSet;

use super::CompileErrorType::UndefinedNonterminal;
use super::{Alternative, CompileError, CompileErrors, FileResult, Location, Rule};
use crate::grammar::Symbol::Nonterminal;

fn get_alternative_undefined_symbols(alternative: &Alternative, location: &Location, defined: &HashSet<&str>) -> CompileErrors {
    alternative
        .iter()
        .filter_map(|symbol| match symbol {
            Nonterminal(symbol) => Some(symbol),
            _ => None,
        })
        .filter(|symbol| !defined.contains(symbol.as_str()))
        .map(|symbol_text| CompileError::at(location.to_owned(), UndefinedNonterminal(symbol_text.to_owned())))
        .collect()
}

// Undefined nonterminals across all rules, in line order
fn get_undefined_symbols(rules: &[Rule]) -> CompileErrors {
    let defined: HashSet<&str> = rules.iter().map(|rule| rule.symbol.as_str()).collect();

    rules
        .iter()
        .flat_map(|rule| {
            rule.rewrite
                .iter()
                .flat_map(|alternative| get_alternative_undefined_symbols(alternative, &rule.location, &defined))
                .collect::<CompileErrors>()
        })
        .collect()
}

pub(super) fn verify_rules(rules: &[Rule]) -> FileResult<()> {
    let errors = get_undefined_symbols(rules);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
