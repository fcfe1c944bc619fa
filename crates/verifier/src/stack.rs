//! Stack balance analysis for compiled grammars.
//!
//! Simulates stack depth through every rule, block by block. Both branches
//! of a conditional must leave the same depth, loop bodies must leave the
//! depth they started with, and each rule must end with exactly its result
//! on the stack. Silent-fail nesting is tracked the same way.

use std::ops::Range;

use crate::error::VerifyError;
use crate::structural::GrammarContext;
use pegcode_common::{BlockIter, CompiledGrammar, Instruction};

/// Run the stack balance check on every rule that decoded cleanly.
pub fn check_stack(grammar: &CompiledGrammar, ctx: &GrammarContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    for (i, rule) in grammar.rules.iter().enumerate() {
        if !ctx.decoded.get(i).copied().unwrap_or(false) {
            continue;
        }
        let mut sim = Simulator {
            rule: i,
            code: &rule.bytecode.code,
            errors: &mut errors,
        };
        let start = State {
            depth: 0,
            silent: 0,
        };
        if let Some(end) = sim.block(0..rule.bytecode.len(), start) {
            if end.depth != 1 {
                errors.push(VerifyError::UnbalancedRule {
                    rule: i,
                    depth: end.depth,
                });
            }
            if end.silent != 0 {
                errors.push(VerifyError::UnbalancedSilentFails {
                    rule: i,
                    at: rule.bytecode.len(),
                });
            }
        }
    }

    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct State {
    depth: usize,
    silent: usize,
}

struct Simulator<'a> {
    rule: usize,
    code: &'a [u32],
    errors: &'a mut Vec<VerifyError>,
}

impl Simulator<'_> {
    /// Returns the state after the block, or `None` once an error makes the
    /// rest of the rule meaningless.
    fn block(&mut self, range: Range<usize>, mut state: State) -> Option<State> {
        for item in BlockIter::new(self.code, range) {
            // The structural pass already reported decode errors.
            let (at, instr) = item.ok()?;
            state = self.step(at, &instr, state)?;
        }
        Some(state)
    }

    fn step(&mut self, at: usize, instr: &Instruction, state: State) -> Option<State> {
        let depth = state.depth;
        match instr {
            Instruction::Push { .. }
            | Instruction::PushCurrPos
            | Instruction::PushEmptyString
            | Instruction::PushEmptyArray
            | Instruction::PushFailed
            | Instruction::AcceptN { .. }
            | Instruction::AcceptString { .. }
            | Instruction::Fail { .. }
            | Instruction::Rule { .. } => Some(State {
                depth: depth + 1,
                ..state
            }),
            Instruction::Pop | Instruction::PopCurrPos => self.pop(at, state, 1, 0),
            Instruction::PopN { n } => self.pop(at, state, *n, 0),
            Instruction::Nip | Instruction::NipCurrPos | Instruction::Append => {
                self.pop(at, state, 2, 1)
            }
            Instruction::Wrap { n } => self.pop(at, state, *n, 1),
            Instruction::Text => self.pop(at, state, 2, 2),
            Instruction::ReportSavedPos { offset } => {
                self.need(at, depth, offset + 1)?;
                Some(state)
            }
            Instruction::ReportCurrPos => Some(state),
            Instruction::Call { pop, params, .. } => {
                for &offset in &self.code[params.clone()] {
                    self.need(at, depth, offset as usize + 1)?;
                }
                self.pop(at, state, *pop, 1)
            }
            Instruction::SilentFailsOn => Some(State {
                silent: state.silent + 1,
                ..state
            }),
            Instruction::SilentFailsOff => {
                if state.silent == 0 {
                    self.errors.push(VerifyError::UnbalancedSilentFails {
                        rule: self.rule,
                        at,
                    });
                    return None;
                }
                Some(State {
                    silent: state.silent - 1,
                    ..state
                })
            }
            Instruction::WhileNotError { body } => {
                self.need(at, depth, 1)?;
                let after = self.block(body.clone(), state)?;
                if after.depth != depth {
                    self.errors.push(VerifyError::UnbalancedLoop {
                        rule: self.rule,
                        at,
                        before: depth,
                        after: after.depth,
                    });
                    return None;
                }
                if after.silent != state.silent {
                    self.errors.push(VerifyError::UnbalancedSilentFails {
                        rule: self.rule,
                        at,
                    });
                    return None;
                }
                Some(state)
            }
            _ => {
                let (then, otherwise) = instr.branches()?;
                if !matches!(
                    instr,
                    Instruction::MatchAny { .. }
                        | Instruction::MatchString { .. }
                        | Instruction::MatchStringIc { .. }
                        | Instruction::MatchClass { .. }
                ) {
                    // Conditionals test the top of the stack without popping.
                    self.need(at, depth, 1)?;
                }
                let a = self.block(then, state)?;
                let b = self.block(otherwise, state)?;
                if a.depth != b.depth {
                    self.errors.push(VerifyError::BranchMismatch {
                        rule: self.rule,
                        at,
                        then_depth: a.depth,
                        else_depth: b.depth,
                    });
                    return None;
                }
                if a.silent != b.silent {
                    self.errors.push(VerifyError::UnbalancedSilentFails {
                        rule: self.rule,
                        at,
                    });
                    return None;
                }
                Some(a)
            }
        }
    }

    fn need(&mut self, at: usize, depth: usize, needed: usize) -> Option<()> {
        if depth < needed {
            self.errors.push(VerifyError::StackUnderflow {
                rule: self.rule,
                at,
                needed,
                depth,
            });
            return None;
        }
        Some(())
    }

    /// Pop `n` slots, then push `push`.
    fn pop(&mut self, at: usize, state: State, n: usize, push: usize) -> Option<State> {
        self.need(at, state.depth, n)?;
        Some(State {
            depth: state.depth - n + push,
            ..state
        })
    }
}
