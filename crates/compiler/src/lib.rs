//! pegcode compiler: grammar AST → bytecode.
//!
//! Compilation runs the grammar checks in [`passes`], drops proxy rules, then
//! lowers every remaining rule to bytecode while filling the constant and
//! action tables.
//!
//! # Usage
//!
//! ```
//! use pegcode_compiler::{compile, disassemble, CompileOptions};
//! use pegcode_grammar::builder::*;
//! use pegcode_grammar::{Grammar, Rule};
//!
//! let grammar = Grammar::new(vec![Rule::new("start", lit("a"))]);
//! let out = compile(&grammar, &CompileOptions::default()).unwrap();
//! assert_eq!(out.grammar.start_rules, vec!["start"]);
//! assert!(disassemble(&out.grammar).unwrap().contains("MATCH_STRING 0"));
//! ```

pub mod options;
pub mod passes;

mod disassembler;
mod generate;

pub use disassembler::{disassemble, disassemble_code};
pub use options::CompileOptions;

use pegcode_common::{Bytecode, CompiledGrammar, CompiledRule, GrammarError};
use pegcode_grammar::Grammar;
use tracing::{debug, instrument, warn};

use generate::Generator;

/// The result of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    pub grammar: CompiledGrammar,
    /// Rules no allowed start rule can reach. Compiled anyway.
    pub unused_rules: Vec<String>,
}

/// Check and lower `grammar`.
///
/// Returns the first error found. Unused rules are warnings, not errors.
#[instrument(skip_all, name = "compile", fields(rules = grammar.rules.len()))]
pub fn compile(grammar: &Grammar, options: &CompileOptions) -> Result<Compilation, GrammarError> {
    let allowed: Vec<String> = if options.allowed_start_rules.is_empty() {
        grammar.rules.iter().take(1).map(|r| r.name.clone()).collect()
    } else {
        options.allowed_start_rules.clone()
    };

    passes::check(grammar, &allowed)?;

    let unused_rules = passes::unused::unused_rules(grammar, &allowed);
    for name in &unused_rules {
        warn!(rule = %name, "rule is not used");
    }

    let proxies = passes::proxies::proxy_targets(grammar, &allowed);
    for (proxy, target) in &proxies {
        debug!(rule = %proxy, target = %target, "proxy rule removed");
    }

    let mut generator = Generator::new(grammar, &proxies);
    let mut rules = Vec::with_capacity(grammar.rules.len() - proxies.len());
    for rule in &grammar.rules {
        if proxies.contains_key(rule.name.as_str()) {
            continue;
        }
        let code = generator.rule(&rule.name, &rule.expression)?;
        debug!(rule = %rule.name, words = code.len(), "rule lowered");
        rules.push(CompiledRule {
            name: rule.name.clone(),
            display_name: rule.display_name().map(str::to_string),
            bytecode: Bytecode::new(code),
        });
    }

    // `check` guarantees at least one rule and one allowed start rule.
    let default_start_rule = allowed.first().cloned().unwrap_or_default();
    let mut start_rules = allowed;
    start_rules.sort();
    start_rules.dedup();

    debug!(
        constants = generator.constants.len(),
        actions = generator.actions.len(),
        "grammar compiled"
    );

    Ok(Compilation {
        grammar: CompiledGrammar {
            rules,
            constants: generator.constants,
            actions: generator.actions,
            start_rules,
            default_start_rule,
            initializer: grammar.initializer.clone(),
        },
        unused_rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegcode_grammar::builder::*;
    use pegcode_grammar::Rule;

    #[test]
    fn default_start_rule_is_first_rule() {
        let g = Grammar::new(vec![
            Rule::new("a", rule_ref("b")),
            Rule::new("b", lit("x")),
        ]);
        let out = compile(&g, &CompileOptions::default()).unwrap();
        assert_eq!(out.grammar.default_start_rule, "a");
        assert_eq!(out.grammar.start_rules, vec!["a"]);
        assert!(out.unused_rules.is_empty());
    }

    #[test]
    fn start_rules_sorted_and_deduplicated() {
        let g = Grammar::new(vec![
            Rule::new("a", lit("x")),
            Rule::new("b", lit("y")),
        ]);
        let opts = CompileOptions::new()
            .allow_start_rule("b")
            .allow_start_rule("a")
            .allow_start_rule("b");
        let out = compile(&g, &opts).unwrap();
        assert_eq!(out.grammar.start_rules, vec!["a", "b"]);
        assert_eq!(out.grammar.default_start_rule, "b");
    }

    #[test]
    fn unused_rules_reported_not_rejected() {
        let g = Grammar::new(vec![
            Rule::new("a", lit("x")),
            Rule::new("orphan", lit("y")),
        ]);
        let out = compile(&g, &CompileOptions::default()).unwrap();
        assert_eq!(out.unused_rules, vec!["orphan"]);
        assert_eq!(out.grammar.rules.len(), 2);
    }

    #[test]
    fn display_name_carried_into_output() {
        let g = Grammar::new(vec![Rule::named("ws", "whitespace", lit(" "))]);
        let out = compile(&g, &CompileOptions::default()).unwrap();
        assert_eq!(out.grammar.rules[0].display_name.as_deref(), Some("whitespace"));
    }

    #[test]
    fn check_errors_abort_compilation() {
        let g = Grammar::new(vec![Rule::new("a", rule_ref("missing"))]);
        assert!(matches!(
            compile(&g, &CompileOptions::default()),
            Err(GrammarError::UndefinedRule { .. })
        ));
    }

    #[test]
    fn proxy_rules_not_emitted() {
        let g = Grammar::new(vec![
            Rule::new("start", seq(vec![rule_ref("alias"), rule_ref("b")])),
            Rule::new("alias", rule_ref("b")),
            Rule::new("b", lit("x")),
        ]);
        let out = compile(&g, &CompileOptions::default()).unwrap();
        let names: Vec<_> = out.grammar.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["start", "b"]);
        let listing = disassemble_code(&out.grammar.rules[0].bytecode.code).unwrap();
        assert_eq!(listing.matches("RULE 1\n").count(), 2);
    }

    #[test]
    fn proxy_start_rule_kept() {
        let g = Grammar::new(vec![
            Rule::new("start", rule_ref("b")),
            Rule::new("b", lit("x")),
        ]);
        let out = compile(&g, &CompileOptions::default()).unwrap();
        assert_eq!(out.grammar.rules.len(), 2);
    }

    #[test]
    fn initializer_preserved() {
        let g = Grammar::new(vec![Rule::new("a", lit("x"))]).with_initializer("setup");
        let out = compile(&g, &CompileOptions::default()).unwrap();
        assert_eq!(out.grammar.initializer.as_deref(), Some("setup"));
    }
}
