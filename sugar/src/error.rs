use thiserror::Error;

use crate::prelude::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse the input ({} error(s))", .0.len())]
    Parse(Vec<ParseError>),
    #[error("Found a free variable `{0}`")]
    UnboundVariable(String),
    #[error("Character {0:?} does not fit in 8 bits")]
    CharOutOfRange(char),
    #[error("Tagged records cannot be {0}")]
    Unsupported(&'static str),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of [`crate::evaluate`] or [`crate::run`]: either the sugared side
/// failed, or the normalizer behind the boundary gave up.
#[derive(Error, Debug)]
pub enum EvalError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Sugar(#[from] Error),
    #[error("Normalization failed: {0}")]
    Normalize(#[source] E),
}
