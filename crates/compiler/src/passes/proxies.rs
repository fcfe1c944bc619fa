//! Proxy rules: rules whose whole expression is a reference to another rule.
//!
//! A proxy adds a `RULE` call and nothing else, so references to it are
//! redirected to the rule it stands for and the proxy itself is not
//! emitted. Proxies that are allowed start rules stay in the output.

use std::collections::HashMap;

use pegcode_grammar::{Expr, Grammar};

use super::RuleMap;

/// Removable proxies, each mapped to the first rule along its chain that is
/// not a proxy. Runs after the checks, so chains are acyclic and every
/// reference resolves.
pub fn proxy_targets<'g>(
    grammar: &'g Grammar,
    start_rules: &[String],
) -> HashMap<&'g str, &'g str> {
    let map = RuleMap::new(grammar);
    let mut targets = HashMap::new();

    for rule in &grammar.rules {
        if start_rules.iter().any(|s| *s == rule.name) {
            continue;
        }
        let Expr::RuleRef(first) = &rule.expression else {
            continue;
        };
        let mut target = first.as_str();
        // A cycle of proxies is left recursion; the bound only guards misuse.
        for _ in 0..grammar.rules.len() {
            match map.get(target).map(|r| &r.expression) {
                Some(Expr::RuleRef(next)) => target = next.as_str(),
                _ => break,
            }
        }
        targets.insert(rule.name.as_str(), target);
    }

    targets
}
