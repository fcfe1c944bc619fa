//! Hard limits on compiled grammars.

use crate::error::VerifyError;
use pegcode_common::CompiledGrammar;

/// Maximum bytecode size of a single rule, in words.
pub const MAX_RULE_WORDS: usize = 1 << 20;

/// Maximum depth of nested then/else/loop blocks.
///
/// The compiler lowers the alternatives of a choice and the elements of a
/// sequence side by side, so this bounds how deeply expressions nest inside
/// one another, not how many alternatives or elements a rule has.
pub const MAX_NESTING: usize = 4_096;

/// Run the limits check.
pub fn check_limits(grammar: &CompiledGrammar) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    if grammar.rules.is_empty() {
        errors.push(VerifyError::NoRules);
    }

    for (i, rule) in grammar.rules.iter().enumerate() {
        let size = rule.bytecode.len();
        if size > MAX_RULE_WORDS {
            errors.push(VerifyError::RuleTooLarge {
                rule: i,
                size,
                max: MAX_RULE_WORDS,
            });
        }
    }

    errors
}
