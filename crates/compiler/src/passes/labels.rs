//! Duplicate label detection.
//!
//! A label is in scope for the rest of its sequence, including nested
//! expressions. Every other construct gives its children a copy of the
//! scope, so sibling alternatives may reuse a name.

use std::collections::HashSet;

use pegcode_common::GrammarError;
use pegcode_grammar::{Expr, Grammar};

pub fn check_duplicate_labels(grammar: &Grammar) -> Result<(), GrammarError> {
    for rule in &grammar.rules {
        let mut scope = HashSet::new();
        check(&rule.expression, &mut scope, &rule.name)?;
    }
    Ok(())
}

fn check<'a>(expr: &'a Expr, scope: &mut HashSet<&'a str>, rule: &str) -> Result<(), GrammarError> {
    match expr {
        Expr::Sequence(items) => {
            let mut inner = scope.clone();
            for item in items {
                check(item, &mut inner, rule)?;
            }
            Ok(())
        }
        Expr::Labeled { label, expr } => {
            if scope.contains(label.as_str()) {
                return Err(GrammarError::DuplicateLabel {
                    label: label.clone(),
                    rule: rule.to_string(),
                });
            }
            check(expr, &mut scope.clone(), rule)?;
            scope.insert(label);
            Ok(())
        }
        other => {
            for child in other.children() {
                check(child, &mut scope.clone(), rule)?;
            }
            Ok(())
        }
    }
}
