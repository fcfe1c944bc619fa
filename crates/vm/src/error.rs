//! Errors raised by the pegcode VM.
//!
//! [`SyntaxError`] is the input's fault and is meant to be shown to users.
//! [`RuntimeError`] means the bytecode broke an invariant the compiler and
//! verifier should have ruled out; it carries the rule index and the word
//! offset (`at`) for debugging.

use pegcode_common::constant::escape;
use pegcode_common::{DecodeError, Expectation, GrammarError};
use thiserror::Error;

/// Errors that occur during execution that indicate broken bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Bytecode failed to decode.
    #[error("rule {rule}: {source}")]
    Decode {
        rule: usize,
        #[source]
        source: DecodeError,
    },

    /// Pop or peek on too shallow a stack.
    #[error("stack underflow in rule {rule} at {at}")]
    StackUnderflow { rule: usize, at: usize },

    /// A slot that should hold a saved position holds something else.
    #[error("expected a saved position in rule {rule} at {at}")]
    NotAPosition { rule: usize, at: usize },

    /// A slot that should hold a value holds a position or the failure marker.
    #[error("expected a value in rule {rule} at {at}")]
    NotAValue { rule: usize, at: usize },

    /// APPEND or IF_ARRLEN_* on something other than an array.
    #[error("expected an array in rule {rule} at {at}")]
    NotAnArray { rule: usize, at: usize },

    /// Operand names a missing constant or one of the wrong kind.
    #[error("bad constant {index} in rule {rule} at {at}")]
    BadConstant { rule: usize, at: usize, index: usize },

    /// RULE operand past the end of the rule list.
    #[error("unknown rule {index} called from rule {rule} at {at}")]
    UnknownRule { rule: usize, at: usize, index: usize },

    /// CALL operand past the end of the action table.
    #[error("unknown action {index} in rule {rule} at {at}")]
    UnknownAction { rule: usize, at: usize, index: usize },

    /// SILENT_FAILS_OFF without a matching SILENT_FAILS_ON.
    #[error("unbalanced silent-fail depth in rule {rule} at {at}")]
    UnbalancedSilentFails { rule: usize, at: usize },

    /// A rule left other than one result on the stack.
    #[error("rule {rule} left {depth} values on the stack (expected 1)")]
    RuleUnbalanced { rule: usize, depth: usize },

    /// Rule calls nested deeper than `ParserOptions::max_rule_depth`.
    #[error("rule call depth exceeded limit {limit} entering rule {rule}")]
    RuleDepthExceeded { rule: usize, limit: usize },

    /// An action entry has no hook bound to it.
    #[error("no hook bound for action {action}: {{{code}}}")]
    UnboundAction { action: usize, code: String },
}

/// A parse failure attributable to the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    /// Sorted by description, no duplicates. Empty when an action raised a
    /// custom error.
    pub expected: Vec<Expectation>,
    /// The character at `offset`, or `None` at end of input.
    pub found: Option<char>,
    /// 0-based char offset.
    pub offset: usize,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

impl SyntaxError {
    /// `Expected A, B or C but "x" found.`
    pub fn build_message(expected: &[Expectation], found: Option<char>) -> String {
        let found = match found {
            Some(ch) => format!("\"{}\"", escape(&ch.to_string())),
            None => "end of input".to_string(),
        };
        let descriptions: Vec<&str> = expected.iter().map(|e| e.description.as_str()).collect();
        match descriptions.split_last() {
            None => format!("Unexpected {found}."),
            Some((last, [])) => format!("Expected {last} but {found} found."),
            Some((last, rest)) => {
                format!("Expected {} or {last} but {found} found.", rest.join(", "))
            }
        }
    }
}

/// Everything [`Parser::parse`](crate::Parser::parse) can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The requested start rule is not allowed.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("internal error: {0}")]
    Internal(#[from] RuntimeError),
}
