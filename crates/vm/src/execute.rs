//! Block execution and opcode dispatch.
//!
//! Blocks run recursively: conditionals run one of their inline blocks,
//! loops rerun their body, and `RULE` runs the callee's bytecode in a new
//! stack frame. Rule calls therefore nest on the native call stack.

use std::ops::Range;

use pegcode_common::{BlockIter, Expectation, Instruction};

use crate::error::{ParseError, RuntimeError};
use crate::hooks::{ActionAbort, ActionScope};
use crate::machine::{Session, Slot};
use crate::value::Value;

impl<'p> Session<'p> {
    /// Run the start rule and turn its outcome into the parse result.
    pub(crate) fn run(&mut self, start: usize) -> Result<Value, ParseError> {
        self.rule = start;
        self.call_rule(start, 0)?;
        let result = self.pop(0)?;

        match result {
            Slot::Value(value) if self.curr_pos == self.input.len() => Ok(value),
            Slot::Value(_) => {
                // Matched, but input remains.
                self.fail(&Expectation::end());
                Err(self.furthest_error().into())
            }
            Slot::Failed => Err(self.furthest_error().into()),
            Slot::Pos(_) => Err(RuntimeError::NotAValue { rule: start, at: 0 }.into()),
        }
    }

    /// Run rule `index` in its own frame, leaving its result on the stack.
    fn call_rule(&mut self, index: usize, at: usize) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let rule = grammar.rules.get(index).ok_or(RuntimeError::UnknownRule {
            rule: self.rule,
            at,
            index,
        })?;
        if let Some(limit) = self.max_rule_depth {
            if self.rule_depth >= limit {
                return Err(RuntimeError::RuleDepthExceeded { rule: index, limit }.into());
            }
        }

        let caller = std::mem::replace(&mut self.rule, index);
        let caller_base = std::mem::replace(&mut self.frame_base, self.stack.len());
        self.rule_depth += 1;

        let code = &rule.bytecode.code;
        let outcome = self.run_block(code, 0..code.len());

        let depth = self.stack.len() - self.frame_base;
        self.rule_depth -= 1;
        self.frame_base = caller_base;
        self.rule = caller;
        outcome?;

        if depth != 1 {
            return Err(RuntimeError::RuleUnbalanced { rule: index, depth }.into());
        }
        Ok(())
    }

    fn run_block(&mut self, code: &'p [u32], block: Range<usize>) -> Result<(), ParseError> {
        for item in BlockIter::new(code, block) {
            let (at, instr) = item.map_err(|source| RuntimeError::Decode {
                rule: self.rule,
                source,
            })?;
            self.exec(code, at, instr)?;
        }
        Ok(())
    }

    fn branch(
        &mut self,
        code: &'p [u32],
        condition: bool,
        then: Range<usize>,
        otherwise: Range<usize>,
    ) -> Result<(), ParseError> {
        self.run_block(code, if condition { then } else { otherwise })
    }

    fn exec(&mut self, code: &'p [u32], at: usize, instr: Instruction) -> Result<(), ParseError> {
        match instr {
            // Stack
            Instruction::Push { constant } => {
                let s = self.literal(constant, at)?.to_string();
                self.push_value(Value::Str(s));
            }
            Instruction::PushCurrPos => self.push(Slot::Pos(self.curr_pos)),
            Instruction::PushEmptyString => self.push_value(Value::Str(String::new())),
            Instruction::PushEmptyArray => self.push_value(Value::Array(Vec::new())),
            Instruction::PushFailed => self.push(Slot::Failed),
            Instruction::Pop => {
                self.pop(at)?;
            }
            Instruction::PopCurrPos => self.curr_pos = self.pop_pos(at)?,
            Instruction::PopN { n } => {
                self.pop_n(n, at)?;
            }
            Instruction::Nip => {
                let top = self.pop(at)?;
                self.pop(at)?;
                self.push(top);
            }
            Instruction::NipCurrPos => {
                let top = self.pop(at)?;
                self.curr_pos = self.pop_pos(at)?;
                self.push(top);
            }
            Instruction::Append => {
                let slot = self.pop(at)?;
                let value = self.value_of(slot, at)?;
                let rule = self.rule;
                match self.top_mut(at)? {
                    Slot::Value(Value::Array(items)) => items.push(value),
                    _ => return Err(RuntimeError::NotAnArray { rule, at }.into()),
                }
            }
            Instruction::Wrap { n } => {
                let items = self
                    .pop_n(n, at)?
                    .into_iter()
                    .map(|slot| self.value_of(slot, at))
                    .collect::<Result<Vec<_>, _>>()?;
                self.push_value(Value::Array(items));
            }
            Instruction::Text => {
                self.pop(at)?;
                let start = self.position_at(0, at)?;
                let text = self.text(start, self.curr_pos);
                self.push_value(Value::Str(text));
            }

            // Conditions and loops
            Instruction::If { then, otherwise } => {
                let cond = self.value_at(0, at)?.is_truthy();
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::IfError { then, otherwise } => {
                let cond = matches!(self.top(at)?, Slot::Failed);
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::IfNotError { then, otherwise } => {
                let cond = !matches!(self.top(at)?, Slot::Failed);
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::IfArrlenMin {
                bound,
                then,
                otherwise,
            } => {
                let cond = self.top_array_len(at)? < bound;
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::IfArrlenMax {
                bound,
                then,
                otherwise,
            } => {
                let cond = self.top_array_len(at)? >= bound;
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::WhileNotError { body } => {
                while !matches!(self.top(at)?, Slot::Failed) {
                    self.run_block(code, body.clone())?;
                }
            }

            // Input
            Instruction::MatchAny { then, otherwise } => {
                let cond = self.curr_pos < self.input.len();
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::MatchString {
                constant,
                then,
                otherwise,
            } => {
                let s = self.literal(constant, at)?;
                let rest = self.input.get(self.curr_pos..).unwrap_or(&[]);
                let cond =
                    s.chars().count() <= rest.len() && s.chars().zip(rest).all(|(a, b)| a == *b);
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::MatchStringIc {
                constant,
                len,
                then,
                otherwise,
            } => {
                let s = self.literal(constant, at)?;
                // The window is `len` input chars; lower-casing may change its length.
                let cond = match self.input.get(self.curr_pos..self.curr_pos.saturating_add(len)) {
                    Some(slice) => slice.iter().flat_map(|c| c.to_lowercase()).eq(s.chars()),
                    None => false,
                };
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::MatchClass {
                constant,
                then,
                otherwise,
            } => {
                let grammar = self.grammar;
                let matcher = match grammar.constants.class(constant) {
                    Some(m) => m,
                    None => return Err(self.bad_constant(constant, at).into()),
                };
                let cond = self
                    .input
                    .get(self.curr_pos)
                    .is_some_and(|&ch| matcher.matches(ch));
                self.branch(code, cond, then, otherwise)?;
            }
            Instruction::AcceptN { n } => {
                let end = (self.curr_pos + n).min(self.input.len());
                let text = self.text(self.curr_pos, end);
                self.push_value(Value::Str(text));
                self.curr_pos = end;
            }
            Instruction::AcceptString { constant } => {
                let s = self.literal(constant, at)?;
                self.curr_pos += s.chars().count();
                self.push_value(Value::Str(s.to_string()));
            }
            Instruction::Fail { expectation } => {
                let grammar = self.grammar;
                let e = match grammar.constants.expectation(expectation) {
                    Some(e) => e,
                    None => return Err(self.bad_constant(expectation, at).into()),
                };
                self.push(Slot::Failed);
                self.fail(e);
            }

            // Actions and rules
            Instruction::ReportSavedPos { offset } => {
                self.reported_pos = self.position_at(offset, at)?;
            }
            Instruction::ReportCurrPos => self.reported_pos = self.curr_pos,
            Instruction::Call {
                action,
                pop,
                params,
            } => {
                let args = code[params]
                    .iter()
                    .map(|&offset| self.value_at(offset as usize, at).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                let value = self.invoke(action, &args, at)?;
                self.pop_n(pop, at)?;
                self.push_value(value);
            }
            Instruction::Rule { index } => self.call_rule(index, at)?,

            Instruction::SilentFailsOn => self.silent_fails += 1,
            Instruction::SilentFailsOff => {
                self.silent_fails = self.silent_fails.checked_sub(1).ok_or(
                    RuntimeError::UnbalancedSilentFails {
                        rule: self.rule,
                        at,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn invoke(&self, action: usize, args: &[Value], at: usize) -> Result<Value, ParseError> {
        let (Some(hook), Some(entry)) = (self.hooks.get(action), self.grammar.actions.get(action))
        else {
            return Err(RuntimeError::UnknownAction {
                rule: self.rule,
                at,
                index: action,
            }
            .into());
        };

        let scope = ActionScope::new(
            &self.input,
            self.reported_pos,
            self.curr_pos,
            &self.positions,
            &entry.params,
            args,
        );
        match (hook.as_ref())(&scope) {
            Ok(value) => Ok(value),
            Err(ActionAbort::Expected(description)) => {
                let expected = vec![Expectation::other(&description)];
                Err(self.syntax_error(None, expected, self.reported_pos).into())
            }
            Err(ActionAbort::Error(message)) => {
                Err(self.syntax_error(Some(message), Vec::new(), self.reported_pos).into())
            }
        }
    }

    fn literal(&self, index: usize, at: usize) -> Result<&'p str, RuntimeError> {
        let grammar = self.grammar;
        grammar
            .constants
            .literal(index)
            .ok_or_else(|| self.bad_constant(index, at))
    }

    fn bad_constant(&self, index: usize, at: usize) -> RuntimeError {
        RuntimeError::BadConstant {
            rule: self.rule,
            at,
            index,
        }
    }
}
