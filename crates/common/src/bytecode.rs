//! Per-rule bytecode container.
//!
//! A rule's bytecode is a flat sequence of 32-bit words. The byte encoding
//! is a raw little-endian concatenation of the words with no header.

use crate::error::DecodeError;
use crate::instruction::{BlockIter, Instruction};

/// The bytecode of one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytecode {
    /// The instruction words.
    pub code: Vec<u32>,
}

impl Bytecode {
    /// Create bytecode from raw words.
    pub fn new(code: Vec<u32>) -> Self {
        Self { code }
    }

    /// Encode the words to bytes. The result length is always `len() * 4`.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.code.len() * 4);
        for word in &self.code {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Decode a byte slice into bytecode.
    ///
    /// The slice length must be a multiple of 4. Every instruction is decoded
    /// once, recursively, so malformed streams are rejected here rather than
    /// at execution time.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() % 4 != 0 {
            return Err(DecodeError::InvalidLength(bytes.len()));
        }

        let code: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let bytecode = Self { code };
        bytecode.validate()?;
        Ok(bytecode)
    }

    /// Check that every instruction, including nested blocks, decodes.
    pub fn validate(&self) -> Result<(), DecodeError> {
        validate_block(&self.code, 0..self.code.len())
    }

    /// Iterate the top-level instructions.
    pub fn instructions(&self) -> BlockIter<'_> {
        BlockIter::new(&self.code, 0..self.code.len())
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns true if there are no words.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

fn validate_block(code: &[u32], block: std::ops::Range<usize>) -> Result<(), DecodeError> {
    for item in BlockIter::new(code, block) {
        let (_, instr) = item?;
        match &instr {
            Instruction::WhileNotError { body } => validate_block(code, body.clone())?,
            other => {
                if let Some((then, otherwise)) = other.branches() {
                    validate_block(code, then)?;
                    validate_block(code, otherwise)?;
                }
            }
        }
    }
    Ok(())
}
