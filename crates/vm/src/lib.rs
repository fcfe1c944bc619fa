//! pegcode VM: the reference backend. Executes compiled grammar bytecode
//! against an input string.
//!
//! The VM is a stack machine with:
//! - A slot stack holding values, saved positions and the failure marker
//! - A cursor and a reported position that actions observe
//! - A furthest-failure accumulator feeding syntax errors
//! - Host hooks for actions and semantic predicates
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use pegcode_common::{Bytecode, CompiledGrammar, CompiledRule, Constant, Expectation, Opcode};
//! use pegcode_vm::{ActionHooks, Parser, ParserOptions, Value};
//!
//! // start = "hi"
//! let mut grammar = CompiledGrammar {
//!     start_rules: vec!["start".into()],
//!     default_start_rule: "start".into(),
//!     ..CompiledGrammar::default()
//! };
//! let s = grammar.constants.add(Constant::Literal("hi".into())) as u32;
//! let e = grammar.constants.add(Constant::Expectation(Expectation::literal("hi"))) as u32;
//! grammar.rules.push(CompiledRule {
//!     name: "start".into(),
//!     display_name: None,
//!     bytecode: Bytecode::new(vec![
//!         Opcode::MatchString as u32, s, 2, 2,
//!         Opcode::AcceptString as u32, s,
//!         Opcode::Fail as u32, e,
//!     ]),
//! });
//!
//! let parser = Parser::new(Arc::new(grammar), &ActionHooks::new(), ParserOptions::default()).unwrap();
//! assert_eq!(parser.parse("hi", None).unwrap(), Value::from("hi"));
//! assert!(parser.parse("ho", None).is_err());
//! ```

pub mod error;
pub mod failure;
pub mod hooks;
pub mod position;
pub mod value;

mod execute;
mod machine;
mod parser;

pub use error::{ParseError, RuntimeError, SyntaxError};
pub use hooks::{ActionAbort, ActionHooks, ActionResult, ActionScope};
pub use parser::{Parser, ParserOptions};
pub use position::Location;
pub use value::Value;
