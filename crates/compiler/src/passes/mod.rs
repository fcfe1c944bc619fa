//! Grammar checks that run before lowering.
//!
//! Each pass returns the first problem it finds. Passes run in a fixed
//! order: later passes rely on earlier ones (left recursion is ruled out
//! before consumption analysis follows rule references).

pub mod consumption;
pub mod labels;
pub mod left_recursion;
pub mod proxies;
pub mod repetition;
pub mod rules;
pub mod unused;

use std::collections::HashMap;

use pegcode_common::GrammarError;
use pegcode_grammar::{Grammar, Rule};

/// Rules by name, for passes that follow references.
pub struct RuleMap<'g> {
    by_name: HashMap<&'g str, &'g Rule>,
}

impl<'g> RuleMap<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            by_name: grammar.rules.iter().map(|r| (r.name.as_str(), r)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'g Rule> {
        self.by_name.get(name).copied()
    }
}

/// Run every error-producing check against `grammar`.
pub fn check(grammar: &Grammar, start_rules: &[String]) -> Result<(), GrammarError> {
    rules::check_rules(grammar)?;
    rules::check_references(grammar)?;
    rules::check_start_rules(grammar, start_rules)?;
    labels::check_duplicate_labels(grammar)?;
    let map = RuleMap::new(grammar);
    left_recursion::check_left_recursion(grammar, &map)?;
    repetition::check_infinite_repetition(grammar, &map)?;
    Ok(())
}
