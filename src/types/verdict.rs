use std::fmt;

/// Outcome of evaluating a [`Rule`](super::Rule).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    /// Result of a scalar rule.
    Scalar(bool),
    /// One result per iteration of a vector rule, in ascending index order.
    Vector(Vec<bool>),
}

impl Verdict {
    /// The results as an ordered sequence; a scalar verdict is a
    /// one-element slice.
    #[must_use]
    pub fn results(&self) -> &[bool] {
        match self {
            Verdict::Scalar(b) => std::slice::from_ref(b),
            Verdict::Vector(v) => v,
        }
    }

    /// `true` when every result is `true` (vacuously for an empty loop).
    #[must_use]
    pub fn all(&self) -> bool {
        self.results().iter().all(|b| *b)
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.results().iter().any(|b| *b)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<bool> {
        match self {
            Verdict::Scalar(b) => vec![b],
            Verdict::Vector(v) => v,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.results())
    }
}
