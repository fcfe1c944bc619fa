//! pegcode common types and bytecode encoding.
//!
//! This crate provides the data shared by the compiler, the verifier and
//! the executor:
//!
//! - [`Opcode`] : the 32 parser opcodes
//! - [`Instruction`] : typed decoding of one instruction and its inline blocks
//! - [`Bytecode`] : a rule's word stream with byte encode/decode
//! - [`ConstantTable`] : literals, class matchers and [`Expectation`]s
//! - [`ActionTable`] : action code fragments with their bound labels
//! - [`CompiledGrammar`] : the complete compilation output
//! - [`DecodeError`], [`GrammarError`]

pub mod action;
pub mod bytecode;
pub mod compiled;
pub mod constant;
pub mod error;
pub mod instruction;
pub mod opcode;

// Re-export commonly used types at the crate root.
pub use action::{ActionEntry, ActionTable};
pub use bytecode::Bytecode;
pub use compiled::{CompiledGrammar, CompiledRule};
pub use constant::{ClassMatcher, Constant, ConstantTable, Expectation, ExpectationKind};
pub use error::{DecodeError, GrammarError};
pub use instruction::{BlockIter, Instruction};
pub use opcode::Opcode;
