//! Host-side action and predicate code.
//!
//! Every entry in a grammar's action table needs a hook before a
//! [`Parser`](crate::Parser) can be built. Hooks are bound by the action's
//! source fragment (compared with surrounding whitespace trimmed) or by its
//! index in the table; an index binding wins.
//!
//! ```
//! use pegcode_vm::{ActionHooks, Value};
//!
//! let hooks = ActionHooks::new()
//!     .on("a + b", |scope| {
//!         let a = scope.arg("a").and_then(Value::as_int).unwrap_or(0);
//!         let b = scope.arg("b").and_then(Value::as_int).unwrap_or(0);
//!         Ok(Value::Int(a + b))
//!     })
//!     .on("parseInt(d)", |scope| {
//!         scope
//!             .text()
//!             .parse::<i64>()
//!             .map(Value::Int)
//!             .map_err(|_| scope.expected("integer"))
//!     });
//! assert_eq!(hooks.len(), 2);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use pegcode_common::ActionTable;

use crate::error::RuntimeError;
use crate::position::{Location, PositionCache};
use crate::value::Value;

/// What a hook returns.
pub type ActionResult = Result<Value, ActionAbort>;

pub(crate) type Hook = Arc<dyn Fn(&ActionScope<'_>) -> ActionResult + Send + Sync>;

/// Ends the parse from inside a hook with a [`SyntaxError`](crate::SyntaxError)
/// at the reported position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionAbort {
    /// One "other" expectation with this description.
    Expected(String),
    /// A custom message in place of the expectation list.
    Error(String),
}

/// What a hook can see: the matched text, where it is, and its labeled
/// arguments.
pub struct ActionScope<'s> {
    input: &'s [char],
    start: usize,
    end: usize,
    positions: &'s RefCell<PositionCache>,
    params: &'s [String],
    args: &'s [Value],
}

impl<'s> ActionScope<'s> {
    pub(crate) fn new(
        input: &'s [char],
        start: usize,
        end: usize,
        positions: &'s RefCell<PositionCache>,
        params: &'s [String],
        args: &'s [Value],
    ) -> Self {
        Self {
            input,
            start,
            end,
            positions,
            params,
            args,
        }
    }

    /// Input from the reported position to the current position.
    pub fn text(&self) -> String {
        let end = self.end.min(self.input.len());
        let start = self.start.min(end);
        self.input[start..end].iter().collect()
    }

    /// The reported position as a char offset.
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn location(&self) -> Location {
        self.positions.borrow_mut().locate(self.input, self.start)
    }

    pub fn line(&self) -> usize {
        self.location().line
    }

    pub fn column(&self) -> usize {
        self.location().column
    }

    /// The value bound to `label`, if the action declares it.
    pub fn arg(&self, label: &str) -> Option<&Value> {
        let i = self.params.iter().position(|p| p == label)?;
        self.args.get(i)
    }

    /// Arguments in label declaration order.
    pub fn args(&self) -> &[Value] {
        self.args
    }

    pub fn params(&self) -> &[String] {
        self.params
    }

    pub fn expected(&self, description: impl Into<String>) -> ActionAbort {
        ActionAbort::Expected(description.into())
    }

    pub fn error(&self, message: impl Into<String>) -> ActionAbort {
        ActionAbort::Error(message.into())
    }
}

/// Hooks for a grammar's actions and semantic predicates.
#[derive(Clone, Default)]
pub struct ActionHooks {
    by_code: HashMap<String, Hook>,
    by_index: HashMap<usize, Hook>,
}

impl ActionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `f` to every action whose code is `code`.
    pub fn on<F>(mut self, code: &str, f: F) -> Self
    where
        F: Fn(&ActionScope<'_>) -> ActionResult + Send + Sync + 'static,
    {
        self.by_code.insert(code.trim().to_string(), Arc::new(f));
        self
    }

    /// Bind `f` to action table entry `index`.
    pub fn on_index<F>(mut self, index: usize, f: F) -> Self
    where
        F: Fn(&ActionScope<'_>) -> ActionResult + Send + Sync + 'static,
    {
        self.by_index.insert(index, Arc::new(f));
        self
    }

    pub fn len(&self) -> usize {
        self.by_code.len() + self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One hook per action table entry, in table order.
    pub(crate) fn resolve(&self, actions: &ActionTable) -> Result<Vec<Hook>, RuntimeError> {
        actions
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                self.by_index
                    .get(&i)
                    .or_else(|| self.by_code.get(entry.code.trim()))
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnboundAction {
                        action: i,
                        code: entry.code.clone(),
                    })
            })
            .collect()
    }
}

impl fmt::Debug for ActionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<&String> = self.by_code.keys().collect();
        codes.sort();
        let mut indices: Vec<&usize> = self.by_index.keys().collect();
        indices.sort();
        f.debug_struct("ActionHooks")
            .field("by_code", &codes)
            .field("by_index", &indices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegcode_common::ActionEntry;

    fn table(codes: &[&str]) -> ActionTable {
        let mut t = ActionTable::new();
        for code in codes {
            t.add(ActionEntry::new(*code, vec![]));
        }
        t
    }

    #[test]
    fn resolves_by_trimmed_code() {
        let hooks = ActionHooks::new().on("x", |_| Ok(Value::Null));
        let resolved = hooks.resolve(&table(&["  x "])).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn index_binding_wins() {
        let hooks = ActionHooks::new()
            .on("x", |_| Ok(Value::Int(1)))
            .on_index(0, |_| Ok(Value::Int(2)));
        let resolved = hooks.resolve(&table(&["x"])).unwrap();
        let positions = RefCell::new(PositionCache::new());
        let scope = ActionScope::new(&[], 0, 0, &positions, &[], &[]);
        assert_eq!((resolved[0].as_ref())(&scope), Ok(Value::Int(2)));
    }

    #[test]
    fn missing_hook_reported() {
        let hooks = ActionHooks::new().on("x", |_| Ok(Value::Null));
        let err = hooks.resolve(&table(&["x", "y"])).err();
        assert_eq!(
            err,
            Some(RuntimeError::UnboundAction {
                action: 1,
                code: "y".into()
            })
        );
    }

    #[test]
    fn scope_exposes_text_location_and_args() {
        let input: Vec<char> = "ab\ncd".chars().collect();
        let positions = RefCell::new(PositionCache::new());
        let params = vec!["first".to_string(), "second".to_string()];
        let args = vec![Value::from("c"), Value::from("d")];
        let scope = ActionScope::new(&input, 3, 5, &positions, &params, &args);
        assert_eq!(scope.text(), "cd");
        assert_eq!(scope.offset(), 3);
        assert_eq!((scope.line(), scope.column()), (2, 1));
        assert_eq!(scope.arg("second"), Some(&Value::from("d")));
        assert_eq!(scope.arg("third"), None);
        assert_eq!(scope.args().len(), 2);
        assert_eq!(scope.expected("x"), ActionAbort::Expected("x".into()));
    }
}
