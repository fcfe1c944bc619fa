//! Structural validation pass for compiled grammars.
//!
//! Decodes every rule's blocks, checks operand indices against the constant,
//! action and rule tables, and checks start rule names. Builds the
//! [`GrammarContext`] consumed by the stack pass.

use std::ops::Range;

use crate::error::VerifyError;
use crate::limits::MAX_NESTING;
use pegcode_common::{CompiledGrammar, Constant, Instruction};

/// Context built from the structural pass, consumed by later passes.
#[derive(Debug, Clone)]
pub struct GrammarContext {
    /// Per rule: whether its bytecode decoded cleanly. Rules that did not are
    /// skipped by later passes.
    pub decoded: Vec<bool>,
    /// Whether a fatal structural error occurred (callers should skip later passes).
    pub fatal: bool,
}

/// Run the structural validation pass.
///
/// Returns the GrammarContext and any errors found.
pub fn check_structural(grammar: &CompiledGrammar) -> (GrammarContext, Vec<VerifyError>) {
    let mut errors = Vec::new();

    for name in &grammar.start_rules {
        if grammar.rule_index(name).is_none() {
            errors.push(VerifyError::UnknownStartRule { name: name.clone() });
        }
    }
    if !grammar.rules.is_empty() && !grammar.is_start_rule(&grammar.default_start_rule) {
        errors.push(VerifyError::DefaultNotAllowed {
            name: grammar.default_start_rule.clone(),
        });
    }

    let decoded = grammar
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let mut checker = Checker {
                grammar,
                rule: i,
                code: &rule.bytecode.code,
                errors: &mut errors,
            };
            checker.block(0..rule.bytecode.len(), 0)
        })
        .collect();

    let ctx = GrammarContext {
        decoded,
        fatal: grammar.rules.is_empty(),
    };
    (ctx, errors)
}

struct Checker<'a> {
    grammar: &'a CompiledGrammar,
    rule: usize,
    code: &'a [u32],
    errors: &'a mut Vec<VerifyError>,
}

impl Checker<'_> {
    /// Check every instruction in `range`. Returns false if the block failed
    /// to decode.
    fn block(&mut self, range: Range<usize>, nesting: usize) -> bool {
        if nesting > MAX_NESTING {
            self.errors.push(VerifyError::NestingTooDeep {
                rule: self.rule,
                at: range.start,
                max: MAX_NESTING,
            });
            return false;
        }

        let mut ip = range.start;
        while ip < range.end {
            let (instr, next) = match Instruction::decode_within(self.code, ip, range.end) {
                Ok(decoded) => decoded,
                Err(source) => {
                    self.errors.push(VerifyError::Decode {
                        rule: self.rule,
                        source,
                    });
                    return false;
                }
            };
            self.operands(&instr, ip);

            let nested_ok = match &instr {
                Instruction::WhileNotError { body } => self.block(body.clone(), nesting + 1),
                _ => match instr.branches() {
                    Some((then, otherwise)) => {
                        let then_ok = self.block(then, nesting + 1);
                        let else_ok = self.block(otherwise, nesting + 1);
                        then_ok && else_ok
                    }
                    None => true,
                },
            };
            if !nested_ok {
                return false;
            }
            ip = next;
        }
        true
    }

    fn operands(&mut self, instr: &Instruction, at: usize) {
        match instr {
            Instruction::Push { constant }
            | Instruction::MatchString { constant, .. }
            | Instruction::MatchStringIc { constant, .. }
            | Instruction::AcceptString { constant } => {
                self.constant(at, *constant, "literal", |c| matches!(c, Constant::Literal(_)));
            }
            Instruction::MatchClass { constant, .. } => {
                self.constant(at, *constant, "class", |c| matches!(c, Constant::Class(_)));
            }
            Instruction::Fail { expectation } => {
                self.constant(at, *expectation, "expectation", |c| {
                    matches!(c, Constant::Expectation(_))
                });
            }
            Instruction::Call { action, params, .. } => match self.grammar.actions.get(*action) {
                None => self.errors.push(VerifyError::ActionOutOfRange {
                    rule: self.rule,
                    at,
                    index: *action,
                }),
                Some(entry) if entry.params.len() != params.len() => {
                    self.errors.push(VerifyError::ArityMismatch {
                        rule: self.rule,
                        at,
                        action: *action,
                        expected: entry.params.len(),
                        found: params.len(),
                    });
                }
                Some(_) => {}
            },
            Instruction::Rule { index } if *index >= self.grammar.rules.len() => {
                self.errors.push(VerifyError::RuleOutOfRange {
                    rule: self.rule,
                    at,
                    index: *index,
                });
            }
            _ => {}
        }
    }

    fn constant(
        &mut self,
        at: usize,
        index: usize,
        expected: &'static str,
        is_kind: impl Fn(&Constant) -> bool,
    ) {
        match self.grammar.constants.get(index) {
            None => self.errors.push(VerifyError::ConstantOutOfRange {
                rule: self.rule,
                at,
                index,
            }),
            Some(c) if !is_kind(c) => self.errors.push(VerifyError::WrongConstantKind {
                rule: self.rule,
                at,
                index,
                expected,
            }),
            Some(_) => {}
        }
    }
}
