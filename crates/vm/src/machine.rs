//! Parse session state: the slot stack, cursor positions, silent-fail depth,
//! the furthest-failure accumulator and the line/column cache.
//!
//! A session lives for exactly one `parse` call, so one compiled grammar can
//! be parsed from many threads at once.

use std::cell::RefCell;

use pegcode_common::{CompiledGrammar, Expectation};

use crate::error::{RuntimeError, SyntaxError};
use crate::failure::FurthestFailure;
use crate::hooks::Hook;
use crate::position::PositionCache;
use crate::value::Value;

/// One stack slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    /// The failure marker. Never equal to any value.
    Failed,
    /// A saved cursor position.
    Pos(usize),
    Value(Value),
}

/// The state of one parse.
pub(crate) struct Session<'p> {
    pub(crate) grammar: &'p CompiledGrammar,
    pub(crate) hooks: &'p [Hook],
    pub(crate) max_rule_depth: Option<usize>,
    pub(crate) input: Vec<char>,
    pub(crate) stack: Vec<Slot>,
    /// Slots below this index belong to calling rules.
    pub(crate) frame_base: usize,
    pub(crate) curr_pos: usize,
    pub(crate) reported_pos: usize,
    pub(crate) silent_fails: usize,
    pub(crate) failure: FurthestFailure,
    pub(crate) positions: RefCell<PositionCache>,
    pub(crate) rule: usize,
    pub(crate) rule_depth: usize,
}

impl<'p> Session<'p> {
    pub(crate) fn new(
        grammar: &'p CompiledGrammar,
        hooks: &'p [Hook],
        max_rule_depth: Option<usize>,
        input: &str,
    ) -> Self {
        Self {
            grammar,
            hooks,
            max_rule_depth,
            input: input.chars().collect(),
            stack: Vec::new(),
            frame_base: 0,
            curr_pos: 0,
            reported_pos: 0,
            silent_fails: 0,
            failure: FurthestFailure::new(),
            positions: RefCell::new(PositionCache::new()),
            rule: 0,
            rule_depth: 0,
        }
    }

    pub(crate) fn push(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    pub(crate) fn push_value(&mut self, value: Value) {
        self.stack.push(Slot::Value(value));
    }

    /// Require `n` slots in the current rule's frame.
    pub(crate) fn need(&self, n: usize, at: usize) -> Result<(), RuntimeError> {
        if self.stack.len() < self.frame_base + n {
            return Err(RuntimeError::StackUnderflow {
                rule: self.rule,
                at,
            });
        }
        Ok(())
    }

    pub(crate) fn pop(&mut self, at: usize) -> Result<Slot, RuntimeError> {
        self.need(1, at)?;
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            rule: self.rule,
            at,
        })
    }

    pub(crate) fn pop_n(&mut self, n: usize, at: usize) -> Result<Vec<Slot>, RuntimeError> {
        self.need(n, at)?;
        let start = self.stack.len() - n;
        Ok(self.stack.split_off(start))
    }

    pub(crate) fn pop_pos(&mut self, at: usize) -> Result<usize, RuntimeError> {
        match self.pop(at)? {
            Slot::Pos(p) => Ok(p),
            _ => Err(self.not_a_position(at)),
        }
    }

    /// The slot `offset` places below the top.
    pub(crate) fn slot(&self, offset: usize, at: usize) -> Result<&Slot, RuntimeError> {
        self.need(offset + 1, at)?;
        Ok(&self.stack[self.stack.len() - 1 - offset])
    }

    pub(crate) fn top(&self, at: usize) -> Result<&Slot, RuntimeError> {
        self.slot(0, at)
    }

    pub(crate) fn top_mut(&mut self, at: usize) -> Result<&mut Slot, RuntimeError> {
        self.need(1, at)?;
        let rule = self.rule;
        self.stack
            .last_mut()
            .ok_or(RuntimeError::StackUnderflow { rule, at })
    }

    pub(crate) fn position_at(&self, offset: usize, at: usize) -> Result<usize, RuntimeError> {
        match self.slot(offset, at)? {
            Slot::Pos(p) => Ok(*p),
            _ => Err(self.not_a_position(at)),
        }
    }

    pub(crate) fn value_at(&self, offset: usize, at: usize) -> Result<&Value, RuntimeError> {
        match self.slot(offset, at)? {
            Slot::Value(v) => Ok(v),
            _ => Err(RuntimeError::NotAValue {
                rule: self.rule,
                at,
            }),
        }
    }

    /// Length of the array on top of the stack.
    pub(crate) fn top_array_len(&self, at: usize) -> Result<usize, RuntimeError> {
        match self.top(at)? {
            Slot::Value(Value::Array(items)) => Ok(items.len()),
            _ => Err(RuntimeError::NotAnArray {
                rule: self.rule,
                at,
            }),
        }
    }

    pub(crate) fn value_of(&self, slot: Slot, at: usize) -> Result<Value, RuntimeError> {
        match slot {
            Slot::Value(v) => Ok(v),
            _ => Err(RuntimeError::NotAValue {
                rule: self.rule,
                at,
            }),
        }
    }

    fn not_a_position(&self, at: usize) -> RuntimeError {
        RuntimeError::NotAPosition {
            rule: self.rule,
            at,
        }
    }

    /// Record a failed expectation at the cursor unless failures are silenced.
    pub(crate) fn fail(&mut self, expectation: &Expectation) {
        if self.silent_fails == 0 {
            self.failure.record(self.curr_pos, expectation);
        }
    }

    pub(crate) fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.input.len());
        self.input[start.min(end)..end].iter().collect()
    }

    pub(crate) fn syntax_error(
        &self,
        message: Option<String>,
        expected: Vec<Expectation>,
        pos: usize,
    ) -> SyntaxError {
        let location = self.positions.borrow_mut().locate(&self.input, pos);
        let found = self.input.get(pos).copied();
        let message = message.unwrap_or_else(|| SyntaxError::build_message(&expected, found));
        SyntaxError {
            message,
            expected,
            found,
            offset: location.offset,
            line: location.line,
            column: location.column,
        }
    }

    /// The error for a failed parse, built from the furthest failure.
    pub(crate) fn furthest_error(&mut self) -> SyntaxError {
        let failure = std::mem::take(&mut self.failure);
        let pos = failure.pos();
        self.syntax_error(None, failure.into_expected(), pos)
    }
}
