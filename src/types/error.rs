use thiserror::Error;

/// Errors raised while building the evaluation context or evaluating a rule.
///
/// All of them are fatal for the condition being evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("type mismatch: cannot apply '{operator}' to {lhs} and {rhs}")]
    TypeMismatch {
        operator: String,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("unsupported value type '{found}'")]
    UnsupportedType { found: String },

    #[error("expected a boolean result, found {found}")]
    NotBoolean { found: &'static str },

    #[error("expected an array at '{path}'")]
    NotAnArray { path: String },

    #[error("path '{path}' not found in input document")]
    PathNotFound { path: String },

    #[error("invalid loop index '{index}'")]
    InvalidIndex { index: String },

    #[error("no value bound for '{key}'; context was not built for this rule")]
    Unbound { key: String },
}
