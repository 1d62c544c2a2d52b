use std::fmt;
use std::time::Duration;

use super::error::EvalError;
use super::verdict::Verdict;

/// A vector-rule iteration that failed and was recorded as `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationFailure {
    pub index: i64,
    pub error: EvalError,
}

/// Detailed evaluation report returned by
/// [`Engine::evaluate_detailed()`](crate::Engine::evaluate_detailed).
///
/// Carries the verdict together with the iteration failures that the
/// verdict alone cannot distinguish from a plain `false`.
#[derive(Debug, Clone)]
#[must_use]
pub struct EvaluationReport {
    verdict: Verdict,
    failures: Vec<IterationFailure>,
    bindings: usize,
    duration: Duration,
}

impl EvaluationReport {
    pub(crate) fn new(
        verdict: Verdict,
        failures: Vec<IterationFailure>,
        bindings: usize,
        duration: Duration,
    ) -> Self {
        Self {
            verdict,
            failures,
            bindings,
            duration,
        }
    }

    /// The evaluation verdict, same as [`Engine::evaluate()`](crate::Engine::evaluate).
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Iterations of a vector rule whose evaluation failed, in index order.
    #[must_use]
    pub fn failures(&self) -> &[IterationFailure] {
        &self.failures
    }

    /// Number of field values resolved from the input document.
    #[must_use]
    pub fn bindings(&self) -> usize {
        self.bindings
    }

    /// Wall-clock duration of both passes.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verdict: {}", self.verdict)?;
        if !self.failures.is_empty() {
            let indices: Vec<String> = self.failures.iter().map(|x| x.index.to_string()).collect();
            write!(f, ", failed iterations: [{}]", indices.join(", "))?;
        }
        write!(f, ", bindings: {}", self.bindings)?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}
