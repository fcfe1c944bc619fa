//! Left recursion detection.
//!
//! A rule is left recursive when it can reach itself through a chain of
//! references each preceded only by expressions that may consume nothing.

use std::collections::HashSet;

use pegcode_common::GrammarError;
use pegcode_grammar::{Expr, Grammar};

use super::consumption::always_consumes;
use super::RuleMap;

pub fn check_left_recursion(grammar: &Grammar, rules: &RuleMap<'_>) -> Result<(), GrammarError> {
    let mut walker = Walker {
        rules,
        stack: Vec::new(),
        clean: HashSet::new(),
    };
    for rule in &grammar.rules {
        walker.visit_rule(&rule.name)?;
    }
    Ok(())
}

struct Walker<'r, 'g> {
    rules: &'r RuleMap<'g>,
    /// Rules entered along the current path.
    stack: Vec<&'g str>,
    /// Rules fully explored without finding a cycle.
    clean: HashSet<&'g str>,
}

impl<'g> Walker<'_, 'g> {
    fn visit_rule(&mut self, name: &str) -> Result<(), GrammarError> {
        let Some(rule) = self.rules.get(name) else {
            return Ok(());
        };
        let name = rule.name.as_str();
        if self.clean.contains(name) {
            return Ok(());
        }
        if self.stack.contains(&name) {
            let mut path: Vec<String> = self.stack.iter().map(|s| s.to_string()).collect();
            path.push(name.to_string());
            return Err(GrammarError::LeftRecursion { path });
        }
        self.stack.push(name);
        self.visit(&rule.expression)?;
        self.stack.pop();
        self.clean.insert(name);
        Ok(())
    }

    fn visit(&mut self, expr: &'g Expr) -> Result<(), GrammarError> {
        match expr {
            Expr::Sequence(items) => {
                for item in items {
                    self.visit(item)?;
                    if always_consumes(item, self.rules) {
                        break;
                    }
                }
                Ok(())
            }
            Expr::Range {
                expr, delimiter, ..
            } => {
                self.visit(expr)?;
                if let Some(d) = delimiter {
                    if !always_consumes(expr, self.rules) {
                        self.visit(d)?;
                    }
                }
                Ok(())
            }
            Expr::RuleRef(name) => self.visit_rule(name),
            other => {
                for child in other.children() {
                    self.visit(child)?;
                }
                Ok(())
            }
        }
    }
}
