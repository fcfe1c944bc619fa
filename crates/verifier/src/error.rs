//! Verification errors for compiled grammars.
//!
//! Every error names the rule (by index) and, where one exists, the word
//! offset (`at`) of the offending instruction. The verifier collects ALL
//! errors, not just the first.

use pegcode_common::DecodeError;
use thiserror::Error;

/// Errors found during static verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    // --- Grammar ---
    /// A compiled grammar must have at least one rule.
    #[error("grammar has no rules")]
    NoRules,

    /// A start rule names no compiled rule.
    #[error("start rule \"{name}\" does not exist")]
    UnknownStartRule { name: String },

    /// The default start rule is not among the allowed start rules.
    #[error("default start rule \"{name}\" is not an allowed start rule")]
    DefaultNotAllowed { name: String },

    // --- Limits ---
    /// Rule bytecode exceeds the word limit.
    #[error("rule {rule} is too large: {size} words (max {max})")]
    RuleTooLarge { rule: usize, size: usize, max: usize },

    /// Blocks nest deeper than the executor allows.
    #[error("rule {rule}: blocks nested too deeply at {at} (max {max})")]
    NestingTooDeep { rule: usize, at: usize, max: usize },

    // --- Structural ---
    /// Bytecode does not decode.
    #[error("rule {rule}: {source}")]
    Decode {
        rule: usize,
        #[source]
        source: DecodeError,
    },

    /// Operand refers past the end of the constant table.
    #[error("rule {rule}: constant {index} out of range at {at}")]
    ConstantOutOfRange { rule: usize, at: usize, index: usize },

    /// Operand refers to a constant of the wrong kind.
    #[error("rule {rule}: constant {index} at {at} is not a {expected}")]
    WrongConstantKind {
        rule: usize,
        at: usize,
        index: usize,
        expected: &'static str,
    },

    /// CALL refers past the end of the action table.
    #[error("rule {rule}: action {index} out of range at {at}")]
    ActionOutOfRange { rule: usize, at: usize, index: usize },

    /// CALL passes a different number of arguments than the action binds.
    #[error("rule {rule}: action {action} takes {expected} arguments, CALL at {at} passes {found}")]
    ArityMismatch {
        rule: usize,
        at: usize,
        action: usize,
        expected: usize,
        found: usize,
    },

    /// RULE refers past the end of the rule list.
    #[error("rule {rule}: rule index {index} out of range at {at}")]
    RuleOutOfRange { rule: usize, at: usize, index: usize },

    // --- Stack ---
    /// An instruction needs more slots than the stack holds.
    #[error("rule {rule}: stack underflow at {at}: needs {needed}, depth {depth}")]
    StackUnderflow {
        rule: usize,
        at: usize,
        needed: usize,
        depth: usize,
    },

    /// The branches of a conditional leave different stack depths.
    #[error("rule {rule}: branches of conditional at {at} end at depths {then_depth} and {else_depth}")]
    BranchMismatch {
        rule: usize,
        at: usize,
        then_depth: usize,
        else_depth: usize,
    },

    /// A loop body changes the stack depth.
    #[error("rule {rule}: loop at {at} changes stack depth from {before} to {after}")]
    UnbalancedLoop {
        rule: usize,
        at: usize,
        before: usize,
        after: usize,
    },

    /// A rule must leave exactly its result on the stack.
    #[error("rule {rule} ends with stack depth {depth}, expected 1")]
    UnbalancedRule { rule: usize, depth: usize },

    /// SILENT_FAILS_ON/OFF are not paired.
    #[error("rule {rule}: unbalanced silent-fail depth at {at}")]
    UnbalancedSilentFails { rule: usize, at: usize },
}
