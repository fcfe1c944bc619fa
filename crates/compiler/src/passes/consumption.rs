//! Whether an expression consumes input every time it succeeds.

use std::collections::HashSet;

use pegcode_grammar::Expr;

use super::RuleMap;

/// Conservative: `false` means "may succeed without consuming".
pub fn always_consumes(expr: &Expr, rules: &RuleMap<'_>) -> bool {
    let mut visiting = HashSet::new();
    consumes(expr, rules, &mut visiting)
}

fn consumes<'g>(expr: &'g Expr, rules: &RuleMap<'g>, visiting: &mut HashSet<&'g str>) -> bool {
    match expr {
        Expr::Choice(alts) => alts.iter().all(|a| consumes(a, rules, visiting)),
        Expr::Sequence(items) => items.iter().any(|i| consumes(i, rules, visiting)),
        Expr::Labeled { expr, .. }
        | Expr::Action { expr, .. }
        | Expr::Named { expr, .. }
        | Expr::Text(expr)
        | Expr::OneOrMore(expr) => consumes(expr, rules, visiting),
        Expr::SimpleAnd(_)
        | Expr::SimpleNot(_)
        | Expr::SemanticAnd(_)
        | Expr::SemanticNot(_)
        | Expr::Optional(_)
        | Expr::ZeroOrMore(_) => false,
        Expr::Range {
            min,
            delimiter,
            expr,
            ..
        } => {
            let min = min.unwrap_or(0);
            if min == 0 {
                return false;
            }
            consumes(expr, rules, visiting)
                || (min > 1
                    && delimiter
                        .as_deref()
                        .is_some_and(|d| consumes(d, rules, visiting)))
        }
        Expr::Literal { value, .. } => !value.is_empty(),
        Expr::Class(_) | Expr::Any => true,
        Expr::RuleRef(name) => {
            let Some(rule) = rules.get(name) else {
                return false;
            };
            // A cycle here is left recursion, reported by its own pass.
            if !visiting.insert(rule.name.as_str()) {
                return false;
            }
            let result = consumes(&rule.expression, rules, visiting);
            visiting.remove(rule.name.as_str());
            result
        }
    }
}
