//! Typed decoding of bytecode words.
//!
//! The executor, the verifier and the disassembler all read bytecode through
//! [`Instruction::decode`]. Inline blocks are returned as index ranges into
//! the same word slice, so decoding never allocates.
//!
//! ```text
//! plain:       op arg..
//! conditional: op arg.. then_len else_len then.. else..
//! loop:        op body_len body..
//! call:        op action pop_count argc param..
//! ```

use std::ops::Range;

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// One decoded instruction. Indices are `usize`, blocks are word ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push { constant: usize },
    PushCurrPos,
    PushEmptyString,
    PushEmptyArray,
    PushFailed,
    Pop,
    PopCurrPos,
    PopN { n: usize },
    Nip,
    NipCurrPos,
    Append,
    Wrap { n: usize },
    Text,

    If { then: Range<usize>, otherwise: Range<usize> },
    IfError { then: Range<usize>, otherwise: Range<usize> },
    IfNotError { then: Range<usize>, otherwise: Range<usize> },
    IfArrlenMin { bound: usize, then: Range<usize>, otherwise: Range<usize> },
    IfArrlenMax { bound: usize, then: Range<usize>, otherwise: Range<usize> },
    WhileNotError { body: Range<usize> },

    MatchAny { then: Range<usize>, otherwise: Range<usize> },
    MatchString { constant: usize, then: Range<usize>, otherwise: Range<usize> },
    /// `len` counts input characters, not characters of the lower-cased constant.
    MatchStringIc { constant: usize, len: usize, then: Range<usize>, otherwise: Range<usize> },
    MatchClass { constant: usize, then: Range<usize>, otherwise: Range<usize> },
    AcceptN { n: usize },
    AcceptString { constant: usize },
    Fail { expectation: usize },

    ReportSavedPos { offset: usize },
    ReportCurrPos,
    /// `params` is the word range holding the stack offsets of the arguments.
    Call { action: usize, pop: usize, params: Range<usize> },
    Rule { index: usize },

    SilentFailsOn,
    SilentFailsOff,
}

impl Instruction {
    /// Decode the instruction at `ip`, bounded by the end of `code`.
    ///
    /// Returns the instruction and the index of the word following it
    /// (including its inline blocks).
    pub fn decode(code: &[u32], ip: usize) -> Result<(Instruction, usize), DecodeError> {
        Self::decode_within(code, ip, code.len())
    }

    /// Decode the instruction at `ip`, requiring it and its blocks to end at
    /// or before `limit`.
    pub fn decode_within(
        code: &[u32],
        ip: usize,
        limit: usize,
    ) -> Result<(Instruction, usize), DecodeError> {
        let limit = limit.min(code.len());
        let word = |i: usize| -> Result<usize, DecodeError> {
            if ip + i < limit {
                Ok(code[ip + i] as usize)
            } else {
                Err(DecodeError::Truncated {
                    at: ip,
                    needed: i + 1,
                    available: limit.saturating_sub(ip),
                })
            }
        };

        let opcode = Opcode::try_from(word(0)? as u32)?;

        // then_len and else_len follow `argc` fixed operands.
        let branches = |argc: usize| -> Result<(Range<usize>, Range<usize>, usize), DecodeError> {
            let then_len = word(1 + argc)?;
            let else_len = word(2 + argc)?;
            let then_start = ip + 3 + argc;
            let else_start = then_start + then_len;
            let end = else_start + else_len;
            if end > limit {
                return Err(DecodeError::BlockOverrun { at: ip, end, limit });
            }
            Ok((then_start..else_start, else_start..end, end))
        };

        let decoded = match opcode {
            Opcode::Push => (Instruction::Push { constant: word(1)? }, ip + 2),
            Opcode::PushCurrPos => (Instruction::PushCurrPos, ip + 1),
            Opcode::PushEmptyString => (Instruction::PushEmptyString, ip + 1),
            Opcode::PushEmptyArray => (Instruction::PushEmptyArray, ip + 1),
            Opcode::PushFailed => (Instruction::PushFailed, ip + 1),
            Opcode::Pop => (Instruction::Pop, ip + 1),
            Opcode::PopCurrPos => (Instruction::PopCurrPos, ip + 1),
            Opcode::PopN => (Instruction::PopN { n: word(1)? }, ip + 2),
            Opcode::Nip => (Instruction::Nip, ip + 1),
            Opcode::NipCurrPos => (Instruction::NipCurrPos, ip + 1),
            Opcode::Append => (Instruction::Append, ip + 1),
            Opcode::Wrap => (Instruction::Wrap { n: word(1)? }, ip + 2),
            Opcode::Text => (Instruction::Text, ip + 1),

            Opcode::If => {
                let (then, otherwise, end) = branches(0)?;
                (Instruction::If { then, otherwise }, end)
            }
            Opcode::IfError => {
                let (then, otherwise, end) = branches(0)?;
                (Instruction::IfError { then, otherwise }, end)
            }
            Opcode::IfNotError => {
                let (then, otherwise, end) = branches(0)?;
                (Instruction::IfNotError { then, otherwise }, end)
            }
            Opcode::IfArrlenMin => {
                let bound = word(1)?;
                let (then, otherwise, end) = branches(1)?;
                (Instruction::IfArrlenMin { bound, then, otherwise }, end)
            }
            Opcode::IfArrlenMax => {
                let bound = word(1)?;
                let (then, otherwise, end) = branches(1)?;
                (Instruction::IfArrlenMax { bound, then, otherwise }, end)
            }
            Opcode::WhileNotError => {
                let start = ip + 2;
                let end = start + word(1)?;
                if end > limit {
                    return Err(DecodeError::BlockOverrun { at: ip, end, limit });
                }
                (Instruction::WhileNotError { body: start..end }, end)
            }

            Opcode::MatchAny => {
                let (then, otherwise, end) = branches(0)?;
                (Instruction::MatchAny { then, otherwise }, end)
            }
            Opcode::MatchString => {
                let constant = word(1)?;
                let (then, otherwise, end) = branches(1)?;
                (Instruction::MatchString { constant, then, otherwise }, end)
            }
            Opcode::MatchStringIc => {
                let constant = word(1)?;
                let len = word(2)?;
                let (then, otherwise, end) = branches(2)?;
                (Instruction::MatchStringIc { constant, len, then, otherwise }, end)
            }
            Opcode::MatchClass => {
                let constant = word(1)?;
                let (then, otherwise, end) = branches(1)?;
                (Instruction::MatchClass { constant, then, otherwise }, end)
            }
            Opcode::AcceptN => (Instruction::AcceptN { n: word(1)? }, ip + 2),
            Opcode::AcceptString => (Instruction::AcceptString { constant: word(1)? }, ip + 2),
            Opcode::Fail => (Instruction::Fail { expectation: word(1)? }, ip + 2),

            Opcode::ReportSavedPos => (Instruction::ReportSavedPos { offset: word(1)? }, ip + 2),
            Opcode::ReportCurrPos => (Instruction::ReportCurrPos, ip + 1),
            Opcode::Call => {
                let action = word(1)?;
                let pop = word(2)?;
                let argc = word(3)?;
                let start = ip + 4;
                let end = start + argc;
                if end > limit {
                    return Err(DecodeError::Truncated {
                        at: ip,
                        needed: 4 + argc,
                        available: limit.saturating_sub(ip),
                    });
                }
                (Instruction::Call { action, pop, params: start..end }, end)
            }
            Opcode::Rule => (Instruction::Rule { index: word(1)? }, ip + 2),

            Opcode::SilentFailsOn => (Instruction::SilentFailsOn, ip + 1),
            Opcode::SilentFailsOff => (Instruction::SilentFailsOff, ip + 1),
        };

        Ok(decoded)
    }

    /// The opcode this instruction was decoded from.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Push { .. } => Opcode::Push,
            Instruction::PushCurrPos => Opcode::PushCurrPos,
            Instruction::PushEmptyString => Opcode::PushEmptyString,
            Instruction::PushEmptyArray => Opcode::PushEmptyArray,
            Instruction::PushFailed => Opcode::PushFailed,
            Instruction::Pop => Opcode::Pop,
            Instruction::PopCurrPos => Opcode::PopCurrPos,
            Instruction::PopN { .. } => Opcode::PopN,
            Instruction::Nip => Opcode::Nip,
            Instruction::NipCurrPos => Opcode::NipCurrPos,
            Instruction::Append => Opcode::Append,
            Instruction::Wrap { .. } => Opcode::Wrap,
            Instruction::Text => Opcode::Text,
            Instruction::If { .. } => Opcode::If,
            Instruction::IfError { .. } => Opcode::IfError,
            Instruction::IfNotError { .. } => Opcode::IfNotError,
            Instruction::IfArrlenMin { .. } => Opcode::IfArrlenMin,
            Instruction::IfArrlenMax { .. } => Opcode::IfArrlenMax,
            Instruction::WhileNotError { .. } => Opcode::WhileNotError,
            Instruction::MatchAny { .. } => Opcode::MatchAny,
            Instruction::MatchString { .. } => Opcode::MatchString,
            Instruction::MatchStringIc { .. } => Opcode::MatchStringIc,
            Instruction::MatchClass { .. } => Opcode::MatchClass,
            Instruction::AcceptN { .. } => Opcode::AcceptN,
            Instruction::AcceptString { .. } => Opcode::AcceptString,
            Instruction::Fail { .. } => Opcode::Fail,
            Instruction::ReportSavedPos { .. } => Opcode::ReportSavedPos,
            Instruction::ReportCurrPos => Opcode::ReportCurrPos,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Rule { .. } => Opcode::Rule,
            Instruction::SilentFailsOn => Opcode::SilentFailsOn,
            Instruction::SilentFailsOff => Opcode::SilentFailsOff,
        }
    }

    /// Then/else blocks of a conditional, if this is one.
    pub fn branches(&self) -> Option<(Range<usize>, Range<usize>)> {
        match self {
            Instruction::If { then, otherwise }
            | Instruction::IfError { then, otherwise }
            | Instruction::IfNotError { then, otherwise }
            | Instruction::IfArrlenMin { then, otherwise, .. }
            | Instruction::IfArrlenMax { then, otherwise, .. }
            | Instruction::MatchAny { then, otherwise }
            | Instruction::MatchString { then, otherwise, .. }
            | Instruction::MatchStringIc { then, otherwise, .. }
            | Instruction::MatchClass { then, otherwise, .. } => {
                Some((then.clone(), otherwise.clone()))
            }
            _ => None,
        }
    }
}

/// Iterates the top-level instructions of one block.
///
/// Nested blocks are skipped; callers recurse into them explicitly.
pub struct BlockIter<'a> {
    code: &'a [u32],
    ip: usize,
    end: usize,
    failed: bool,
}

impl<'a> BlockIter<'a> {
    pub fn new(code: &'a [u32], block: Range<usize>) -> Self {
        Self {
            code,
            ip: block.start,
            end: block.end,
            failed: false,
        }
    }
}

impl Iterator for BlockIter<'_> {
    /// The instruction's start index and the instruction itself.
    type Item = Result<(usize, Instruction), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.ip >= self.end {
            return None;
        }
        let at = self.ip;
        match Instruction::decode_within(self.code, at, self.end) {
            Ok((instr, next)) => {
                self.ip = next;
                Some(Ok((at, instr)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(o: Opcode) -> u32 {
        o as u32
    }

    #[test]
    fn decode_plain_without_operand() {
        let code = [op(Opcode::PushCurrPos)];
        assert_eq!(
            Instruction::decode(&code, 0),
            Ok((Instruction::PushCurrPos, 1))
        );
    }

    #[test]
    fn decode_plain_with_operand() {
        let code = [op(Opcode::Fail), 7];
        assert_eq!(
            Instruction::decode(&code, 0),
            Ok((Instruction::Fail { expectation: 7 }, 2))
        );
    }

    #[test]
    fn decode_conditional_blocks() {
        // MATCH_STRING 0 then=2 else=2 [ACCEPT_STRING 0] [FAIL 1]
        let code = [
            op(Opcode::MatchString),
            0,
            2,
            2,
            op(Opcode::AcceptString),
            0,
            op(Opcode::Fail),
            1,
        ];
        let (instr, next) = Instruction::decode(&code, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::MatchString {
                constant: 0,
                then: 4..6,
                otherwise: 6..8
            }
        );
        assert_eq!(next, 8);
    }

    #[test]
    fn decode_loop() {
        let code = [op(Opcode::WhileNotError), 1, op(Opcode::Append)];
        assert_eq!(
            Instruction::decode(&code, 0),
            Ok((Instruction::WhileNotError { body: 2..3 }, 3))
        );
    }

    #[test]
    fn decode_call_params() {
        let code = [op(Opcode::Call), 3, 2, 2, 1, 0];
        assert_eq!(
            Instruction::decode(&code, 0),
            Ok((
                Instruction::Call {
                    action: 3,
                    pop: 2,
                    params: 4..6
                },
                6
            ))
        );
    }

    #[test]
    fn truncated_operand_rejected() {
        let code = [op(Opcode::PopN)];
        assert_eq!(
            Instruction::decode(&code, 0),
            Err(DecodeError::Truncated {
                at: 0,
                needed: 2,
                available: 1
            })
        );
    }

    #[test]
    fn block_past_limit_rejected() {
        let code = [op(Opcode::IfError), 5, 0, op(Opcode::Pop)];
        assert_eq!(
            Instruction::decode(&code, 0),
            Err(DecodeError::BlockOverrun {
                at: 0,
                end: 8,
                limit: 4
            })
        );
    }

    #[test]
    fn nested_block_bounded_by_parent() {
        // Inner IF_ERROR claims 2 words of then-block, but the parent limit is 4.
        let code = [op(Opcode::IfError), 2, 0, op(Opcode::Pop), op(Opcode::Pop)];
        assert!(matches!(
            Instruction::decode_within(&code, 0, 4),
            Err(DecodeError::BlockOverrun { .. })
        ));
    }

    #[test]
    fn decoded_length_follows_shape() {
        use crate::opcode::{Shape, ALL_OPCODES};
        for &o in &ALL_OPCODES {
            // Operands of 1, empty blocks.
            let (code, expected) = match o.shape() {
                Shape::Plain(n) => {
                    let mut code = vec![op(o)];
                    code.extend(std::iter::repeat(1).take(n));
                    (code, 1 + n)
                }
                Shape::Condition(n) => {
                    let mut code = vec![op(o)];
                    code.extend(std::iter::repeat(1).take(n));
                    code.extend([0, 0]);
                    (code, 3 + n)
                }
                Shape::Loop => (vec![op(o), 0], 2),
                Shape::Call => (vec![op(o), 0, 0, 1, 0], 5),
            };
            let (instr, next) = Instruction::decode(&code, 0).unwrap();
            assert_eq!(instr.opcode(), o);
            assert_eq!(next, expected, "{o}");
        }
    }

    #[test]
    fn match_string_ic_carries_input_length() {
        let code = [op(Opcode::MatchStringIc), 0, 2, 1, 1, op(Opcode::Pop), op(Opcode::Pop)];
        let (instr, next) = Instruction::decode(&code, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::MatchStringIc {
                constant: 0,
                len: 2,
                then: 5..6,
                otherwise: 6..7,
            }
        );
        assert_eq!(next, 7);
    }

    #[test]
    fn illegal_opcode_rejected() {
        assert_eq!(
            Instruction::decode(&[0], 0),
            Err(DecodeError::IllegalOpcode)
        );
    }

    #[test]
    fn opcode_matches_decoded_word() {
        let code = [op(Opcode::IfArrlenMax), 3, 0, 0];
        let (instr, _) = Instruction::decode(&code, 0).unwrap();
        assert_eq!(instr.opcode(), Opcode::IfArrlenMax);
        assert_eq!(instr.branches(), Some((4..4, 4..4)));
    }

    #[test]
    fn block_iter_skips_nested_blocks() {
        let code = [
            op(Opcode::PushCurrPos),
            op(Opcode::IfError),
            1,
            0,
            op(Opcode::Pop),
            op(Opcode::Nip),
        ];
        let items: Vec<_> = BlockIter::new(&code, 0..code.len())
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], (0, Instruction::PushCurrPos));
        assert_eq!(items[2], (5, Instruction::Nip));
    }

    #[test]
    fn block_iter_stops_after_error() {
        let code = [op(Opcode::Pop), 0, op(Opcode::Pop)];
        let items: Vec<_> = BlockIter::new(&code, 0..code.len()).collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }
}
