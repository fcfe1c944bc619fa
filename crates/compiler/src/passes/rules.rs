//! Rule presence, uniqueness and reference resolution.

use std::collections::HashSet;

use pegcode_common::GrammarError;
use pegcode_grammar::Grammar;

/// At least one rule, no name declared twice.
pub fn check_rules(grammar: &Grammar) -> Result<(), GrammarError> {
    if grammar.rules.is_empty() {
        return Err(GrammarError::NoRules);
    }
    let mut seen = HashSet::new();
    for rule in &grammar.rules {
        if !seen.insert(rule.name.as_str()) {
            return Err(GrammarError::DuplicateRule {
                name: rule.name.clone(),
            });
        }
    }
    Ok(())
}

/// Every rule reference names a declared rule.
pub fn check_references(grammar: &Grammar) -> Result<(), GrammarError> {
    for rule in &grammar.rules {
        for name in rule.expression.rule_refs() {
            if grammar.rule(name).is_none() {
                return Err(GrammarError::UndefinedRule {
                    name: name.to_string(),
                    rule: rule.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Every allowed start rule is declared.
pub fn check_start_rules(grammar: &Grammar, start_rules: &[String]) -> Result<(), GrammarError> {
    for name in start_rules {
        if grammar.rule(name).is_none() {
            return Err(GrammarError::UndefinedStartRule { name: name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegcode_grammar::builder::*;
    use pegcode_grammar::Rule;

    #[test]
    fn empty_grammar_rejected() {
        assert_eq!(check_rules(&Grammar::new(vec![])), Err(GrammarError::NoRules));
    }

    #[test]
    fn duplicate_rule_rejected() {
        let g = Grammar::new(vec![
            Rule::new("a", lit("x")),
            Rule::new("b", lit("y")),
            Rule::new("a", lit("z")),
        ]);
        assert_eq!(
            check_rules(&g),
            Err(GrammarError::DuplicateRule { name: "a".into() })
        );
    }

    #[test]
    fn undefined_reference_names_both_rules() {
        let g = Grammar::new(vec![
            Rule::new("start", seq(vec![rule_ref("a"), rule_ref("missing")])),
            Rule::new("a", lit("x")),
        ]);
        assert_eq!(
            check_references(&g),
            Err(GrammarError::UndefinedRule {
                name: "missing".into(),
                rule: "start".into()
            })
        );
    }

    #[test]
    fn reference_inside_delimiter_checked() {
        let g = Grammar::new(vec![Rule::new(
            "list",
            delimited(lit("x"), None, None, rule_ref("sep")),
        )]);
        assert!(matches!(
            check_references(&g),
            Err(GrammarError::UndefinedRule { .. })
        ));
    }

    #[test]
    fn undefined_start_rule_rejected() {
        let g = Grammar::new(vec![Rule::new("a", lit("x"))]);
        assert_eq!(check_start_rules(&g, &["a".into()]), Ok(()));
        assert_eq!(
            check_start_rules(&g, &["b".into()]),
            Err(GrammarError::UndefinedStartRule { name: "b".into() })
        );
    }
}
