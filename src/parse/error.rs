use thiserror::Error;

/// Errors produced when parsing rule text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required token was absent at a specific position.
    #[error("syntax error at offset {position}: expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        position: usize,
    },

    /// The rule is structurally invalid.
    #[error("rule format is malformed: {reason}")]
    MalformedRule { reason: &'static str },
}

impl ParseError {
    pub(crate) fn syntax(
        expected: impl Into<String>,
        found: impl Into<String>,
        position: usize,
    ) -> Self {
        ParseError::Syntax {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    pub(crate) fn malformed(reason: &'static str) -> Self {
        ParseError::MalformedRule { reason }
    }
}
