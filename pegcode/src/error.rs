//! Errors from building a parser out of a grammar.

use pegcode_common::GrammarError;
use pegcode_verifier::VerifyError;
use pegcode_vm::{ParseError, RuntimeError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The grammar was rejected by the compiler's checks.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The compiled bytecode failed static verification.
    #[error("compiled grammar failed verification: {}", summarize(.0))]
    Verify(Vec<VerifyError>),

    /// The parser could not be assembled, e.g. an action has no hook.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<Vec<VerifyError>> for Error {
    fn from(errors: Vec<VerifyError>) -> Self {
        Error::Verify(errors)
    }
}

fn summarize(errors: &[VerifyError]) -> String {
    match errors {
        [] => "no errors reported".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
