//! Rules that no start rule can reach.

use std::collections::HashSet;

use pegcode_grammar::Grammar;

use super::RuleMap;

/// Names of unreachable rules, in declaration order.
pub fn unused_rules(grammar: &Grammar, start_rules: &[String]) -> Vec<String> {
    let map = RuleMap::new(grammar);
    let mut reached: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&str> = start_rules.iter().map(String::as_str).collect();

    while let Some(name) = pending.pop() {
        let Some(rule) = map.get(name) else {
            continue;
        };
        if !reached.insert(rule.name.as_str()) {
            continue;
        }
        pending.extend(rule.expression.rule_refs());
    }

    grammar
        .rules
        .iter()
        .filter(|r| !reached.contains(r.name.as_str()))
        .map(|r| r.name.clone())
        .collect()
}
