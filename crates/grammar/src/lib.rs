//! pegcode grammar AST.
//!
//! A [`Grammar`] is an ordered list of [`Rule`]s, each holding an [`Expr`]
//! tree. Grammars are built in code with the helpers in [`builder`] (a
//! textual front end is a separate concern) and render back to PEG syntax
//! through `Display`.

pub mod builder;
pub mod display;
pub mod expr;

pub use expr::{CharClass, ClassRange, Expr, Grammar, Rule};
