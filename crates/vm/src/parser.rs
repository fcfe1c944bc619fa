//! The public entry point: a compiled grammar bound to its hooks.

use std::fmt;
use std::sync::Arc;

use pegcode_common::{CompiledGrammar, GrammarError};
use tracing::{debug, instrument};

use crate::error::{ParseError, RuntimeError};
use crate::hooks::{ActionHooks, Hook};
use crate::machine::Session;
use crate::value::Value;

/// Runtime options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum nesting of rule calls. `None` leaves recursion bounded only
    /// by the native stack.
    pub max_rule_depth: Option<usize>,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_rule_depth(mut self, depth: usize) -> Self {
        self.max_rule_depth = Some(depth);
        self
    }
}

/// A compiled grammar ready to parse. Immutable and shareable across
/// threads; every [`parse`](Parser::parse) call gets its own session.
#[derive(Clone)]
pub struct Parser {
    grammar: Arc<CompiledGrammar>,
    hooks: Vec<Hook>,
    options: ParserOptions,
}

impl Parser {
    /// Bind `hooks` to every entry of the grammar's action table.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnboundAction`] for the first action without a hook.
    pub fn new(
        grammar: Arc<CompiledGrammar>,
        hooks: &ActionHooks,
        options: ParserOptions,
    ) -> Result<Self, RuntimeError> {
        let hooks = hooks.resolve(&grammar.actions)?;
        Ok(Self {
            grammar,
            hooks,
            options,
        })
    }

    pub fn grammar(&self) -> &CompiledGrammar {
        &self.grammar
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse all of `input` starting from `start_rule`, or from the
    /// grammar's default start rule.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Grammar`] if `start_rule` is not an allowed start rule
    /// - [`ParseError::Syntax`] if the input does not match
    /// - [`ParseError::Internal`] if the bytecode breaks an invariant
    #[instrument(skip_all, name = "parse", fields(chars = input.chars().count(), start = start_rule))]
    pub fn parse(&self, input: &str, start_rule: Option<&str>) -> Result<Value, ParseError> {
        let name = start_rule.unwrap_or(&self.grammar.default_start_rule);
        if !self.grammar.is_start_rule(name) {
            return Err(GrammarError::NotStartRule {
                name: name.to_string(),
            }
            .into());
        }
        let index = self
            .grammar
            .rule_index(name)
            .ok_or_else(|| GrammarError::UndefinedStartRule {
                name: name.to_string(),
            })?;

        let mut session = Session::new(
            &self.grammar,
            &self.hooks,
            self.options.max_rule_depth,
            input,
        );
        let result = session.run(index);
        match &result {
            Ok(_) => debug!(rule = %name, "parse succeeded"),
            Err(ParseError::Syntax(e)) => {
                debug!(rule = %name, offset = e.offset, "parse failed")
            }
            Err(e) => debug!(rule = %name, error = %e, "parse aborted"),
        }
        result
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("rules", &self.grammar.rules.len())
            .field("hooks", &self.hooks.len())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegcode_common::{ActionEntry, Bytecode, CompiledRule, Opcode};

    fn grammar_with_action() -> Arc<CompiledGrammar> {
        let mut g = CompiledGrammar {
            rules: vec![CompiledRule {
                name: "start".into(),
                display_name: None,
                bytecode: Bytecode::new(vec![
                    Opcode::ReportCurrPos as u32,
                    Opcode::Call as u32,
                    0,
                    0,
                    0,
                ]),
            }],
            start_rules: vec!["start".into()],
            default_start_rule: "start".into(),
            ..CompiledGrammar::default()
        };
        g.actions.add(ActionEntry::new("answer", vec![]));
        Arc::new(g)
    }

    #[test]
    fn unbound_action_rejected() {
        let err = Parser::new(grammar_with_action(), &ActionHooks::new(), ParserOptions::new())
            .err();
        assert!(matches!(err, Some(RuntimeError::UnboundAction { action: 0, .. })));
    }

    #[test]
    fn parses_with_bound_hook() {
        let hooks = ActionHooks::new().on("answer", |_| Ok(Value::Int(42)));
        let parser = Parser::new(grammar_with_action(), &hooks, ParserOptions::new()).unwrap();
        assert_eq!(parser.parse("", None), Ok(Value::Int(42)));
    }

    #[test]
    fn start_rule_must_be_allowed() {
        let hooks = ActionHooks::new().on("answer", |_| Ok(Value::Null));
        let parser = Parser::new(grammar_with_action(), &hooks, ParserOptions::new()).unwrap();
        assert_eq!(
            parser.parse("", Some("other")),
            Err(ParseError::Grammar(GrammarError::NotStartRule {
                name: "other".into()
            }))
        );
    }

    #[test]
    fn parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser>();
    }

    #[test]
    fn options_builder() {
        assert_eq!(ParserOptions::new().max_rule_depth, None);
        assert_eq!(ParserOptions::new().max_rule_depth(8).max_rule_depth, Some(8));
    }
}
