use thiserror::Error;

use crate::parse::ParseError;
use crate::EvalError;

/// Unified error type covering parsing, evaluation, input decoding, and I/O.
///
/// Returned by convenience methods like [`Rule::from_file()`](crate::Rule::from_file)
/// and [`Engine::evaluate()`](crate::Engine::evaluate).
#[derive(Debug, Error)]
pub enum RulevalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("invalid input document: {0}")]
    Input(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
