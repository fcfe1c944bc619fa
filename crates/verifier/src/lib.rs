//! pegcode verifier: static analysis for compiled grammars.
//!
//! The verifier checks a [`CompiledGrammar`] for correctness BEFORE a parser
//! runs it. It collects ALL errors (not just the first) and returns them.
//! A grammar that passes can be executed without the runtime ever meeting
//! an undecodable word, a dangling table index or a stack underflow.
//!
//! # Usage
//!
//! ```
//! use pegcode_common::{Bytecode, CompiledGrammar, CompiledRule, Opcode};
//! use pegcode_verifier::verify;
//!
//! let grammar = CompiledGrammar {
//!     rules: vec![CompiledRule {
//!         name: "start".into(),
//!         display_name: None,
//!         bytecode: Bytecode::new(vec![Opcode::PushEmptyString as u32]),
//!     }],
//!     start_rules: vec!["start".into()],
//!     default_start_rule: "start".into(),
//!     ..CompiledGrammar::default()
//! };
//!
//! assert!(verify(&grammar).is_ok());
//! ```
//!
//! # Passes
//!
//! 1. **Limits**: rule count, rule size
//! 2. **Structural**: block decoding, nesting depth, operand indices and kinds, start rules
//! 3. **Stack**: underflow, branch and loop balance, rule result, silent-fail pairing

pub mod error;
pub mod limits;
pub mod stack;
pub mod structural;

pub use error::VerifyError;

use pegcode_common::CompiledGrammar;
use tracing::{debug, instrument, warn};

/// Verify a compiled grammar.
///
/// Returns `Ok(())` if the grammar passes all checks, or
/// `Err(Vec<VerifyError>)` with all errors found.
///
/// Rules whose bytecode does not decode are skipped by the stack pass.
#[instrument(skip_all, name = "verify", fields(rules = grammar.rules.len()))]
pub fn verify(grammar: &CompiledGrammar) -> Result<(), Vec<VerifyError>> {
    let mut all_errors = Vec::new();

    // Pass 1: Limits (independent)
    all_errors.extend(limits::check_limits(grammar));

    // Pass 2: Structural (builds GrammarContext)
    let (ctx, structural_errors) = structural::check_structural(grammar);
    all_errors.extend(structural_errors);

    if !ctx.fatal {
        // Pass 3: Stack
        all_errors.extend(stack::check_stack(grammar, &ctx));
    }

    if all_errors.is_empty() {
        debug!(words = grammar.code_size(), "grammar verified");
        Ok(())
    } else {
        warn!(errors = all_errors.len(), "grammar failed verification");
        Err(all_errors)
    }
}
