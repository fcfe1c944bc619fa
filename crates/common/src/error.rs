//! Decode and grammar errors shared by every pegcode crate.

use thiserror::Error;

/// Errors that occur while decoding a bytecode stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode word 0 is illegal and always rejected.
    #[error("illegal opcode 0x00")]
    IllegalOpcode,

    /// Opcode word not assigned to any operation.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u32),

    /// An instruction's operands run past the end of the stream.
    #[error("truncated instruction at {at}: needs {needed} words, {available} available")]
    Truncated {
        at: usize,
        needed: usize,
        available: usize,
    },

    /// A then/else/body block length runs past the enclosing block.
    #[error("block at {at} extends to {end}, past enclosing end {limit}")]
    BlockOverrun { at: usize, end: usize, limit: usize },

    /// Byte stream length is not a multiple of 4.
    #[error("invalid byte stream length: {0} (must be multiple of 4)")]
    InvalidLength(usize),
}

/// Errors that make a grammar impossible to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar has no rules")]
    NoRules,

    #[error("rule \"{name}\" is already defined")]
    DuplicateRule { name: String },

    #[error("rule \"{name}\" is not defined (referenced from \"{rule}\")")]
    UndefinedRule { name: String, rule: String },

    #[error("start rule \"{name}\" is not defined")]
    UndefinedStartRule { name: String },

    #[error("can't start parsing from rule \"{name}\"")]
    NotStartRule { name: String },

    #[error("label \"{label}\" is already defined in rule \"{rule}\"")]
    DuplicateLabel { label: String, rule: String },

    #[error("invalid character range: {begin:?}-{end:?}")]
    InvalidClassRange { begin: char, end: char },

    #[error("invalid digit base: {base} (must be between 2 and 36)")]
    InvalidDigitBase { base: u32 },

    #[error("possible left recursion detected: {}", path.join(" -> "))]
    LeftRecursion { path: Vec<String> },

    #[error("possible infinite loop when parsing (repetition used with an expression that may not consume any input) in rule \"{rule}\"")]
    InfiniteRepetition { rule: String },

    /// An operand or block length of the rule's code does not fit in a word.
    #[error("rule \"{rule}\" is too large to encode: {value} does not fit in 32 bits")]
    CodeTooLarge { rule: String, value: usize },
}
