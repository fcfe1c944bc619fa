//! Unbounded repetition of expressions that may match nothing never ends.

use pegcode_common::GrammarError;
use pegcode_grammar::{Expr, Grammar};

use super::consumption::always_consumes;
use super::RuleMap;

pub fn check_infinite_repetition(grammar: &Grammar, rules: &RuleMap<'_>) -> Result<(), GrammarError> {
    for rule in &grammar.rules {
        let mut found = false;
        rule.expression.walk(&mut |e| {
            if !found && loops_forever(e, rules) {
                found = true;
            }
        });
        if found {
            return Err(GrammarError::InfiniteRepetition {
                rule: rule.name.clone(),
            });
        }
    }
    Ok(())
}

fn loops_forever(expr: &Expr, rules: &RuleMap<'_>) -> bool {
    match expr {
        Expr::ZeroOrMore(e) | Expr::OneOrMore(e) => !always_consumes(e, rules),
        Expr::Range {
            max: None,
            delimiter,
            expr,
            ..
        } => {
            !always_consumes(expr, rules)
                && !delimiter
                    .as_deref()
                    .is_some_and(|d| always_consumes(d, rules))
        }
        _ => false,
    }
}
