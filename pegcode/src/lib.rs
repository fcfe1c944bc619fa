//! pegcode: PEG grammars compiled to stack-machine bytecode.
//!
//! A [`Grammar`] is built in code, compiled to a [`CompiledGrammar`],
//! statically verified, and handed to a [`Parser`] together with the host's
//! [`ActionHooks`]. The parser is immutable and can be shared across
//! threads; each call to [`Parser::parse`] runs its own session.
//!
//! # Usage
//!
//! ```
//! use pegcode::builder::*;
//! use pegcode::{build, ActionHooks, CharClass, CompileOptions, Grammar, ParserOptions, Rule, Value};
//!
//! // number = digits:$[0-9]+ { parse(digits) }
//! let digit = CharClass::new().range('0', '9').unwrap();
//! let grammar = Grammar::new(vec![Rule::new(
//!     "number",
//!     action("parse(digits)", label("digits", text(plus(class(digit))))),
//! )]);
//!
//! let hooks = ActionHooks::new().on("parse(digits)", |scope| {
//!     let digits = scope.arg("digits").and_then(Value::as_str).unwrap_or("0");
//!     digits
//!         .parse::<i64>()
//!         .map(Value::Int)
//!         .map_err(|e| scope.error(e.to_string()))
//! });
//!
//! let parser = build(&grammar, &CompileOptions::default(), &hooks, ParserOptions::default()).unwrap();
//! assert_eq!(parser.parse("1234", None), Ok(Value::Int(1234)));
//!
//! let err = parser.parse("12x", None).unwrap_err();
//! assert_eq!(err.to_string(), "Expected [0-9] or end of input but \"x\" found.");
//! ```

mod error;

pub use error::Error;

pub use pegcode_common::{CompiledGrammar, Expectation, ExpectationKind, GrammarError};
pub use pegcode_compiler::{compile, disassemble, Compilation, CompileOptions};
pub use pegcode_grammar::{builder, CharClass, Expr, Grammar, Rule};
pub use pegcode_verifier::{verify, VerifyError};
pub use pegcode_vm::{
    ActionAbort, ActionHooks, ActionResult, ActionScope, Location, ParseError, Parser,
    ParserOptions, RuntimeError, SyntaxError, Value,
};

use std::sync::Arc;

use tracing::{debug, instrument};

/// Compile `grammar` and verify the result.
///
/// # Errors
///
/// - [`Error::Grammar`] if a compile-time check rejects the grammar
/// - [`Error::Verify`] if the emitted bytecode fails verification
#[instrument(skip_all, name = "prepare", fields(rules = grammar.rules.len()))]
pub fn prepare(grammar: &Grammar, options: &CompileOptions) -> Result<Compilation, Error> {
    let compilation = compile(grammar, options)?;
    verify(&compilation.grammar)?;
    debug!(
        words = compilation.grammar.code_size(),
        unused = compilation.unused_rules.len(),
        "grammar prepared"
    );
    Ok(compilation)
}

/// Compile, verify and bind `hooks`, producing a ready parser.
///
/// # Errors
///
/// Everything [`prepare`] reports, plus [`Error::Runtime`] when an action in
/// the grammar has no hook.
pub fn build(
    grammar: &Grammar,
    compile_options: &CompileOptions,
    hooks: &ActionHooks,
    parser_options: ParserOptions,
) -> Result<Parser, Error> {
    let compilation = prepare(grammar, compile_options)?;
    let parser = Parser::new(Arc::new(compilation.grammar), hooks, parser_options)?;
    Ok(parser)
}

/// Build a parser and run it once over `input` from the default start rule.
pub fn parse(grammar: &Grammar, hooks: &ActionHooks, input: &str) -> Result<Value, Error> {
    let parser = build(
        grammar,
        &CompileOptions::default(),
        hooks,
        ParserOptions::default(),
    )?;
    Ok(parser.parse(input, None)?)
}
