use std::time::Instant;

use tracing::debug;

use crate::query::Document;
use crate::{Context, EvalError, EvaluationReport, Rule, RulevalError, Verdict};

/// What a vector rule does with an iteration whose evaluation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IterationErrorPolicy {
    /// Record `false` for the iteration and keep going. The error is logged
    /// and reported by [`Engine::evaluate_detailed()`].
    #[default]
    RecordFalse,
    /// Fail the whole evaluation with the first iteration error.
    Abort,
}

/// Builder for configuring an [`Engine`].
///
/// # Example
///
/// ```
/// use ruleval::{Engine, IterationErrorPolicy};
///
/// let engine = Engine::builder()
///     .iteration_errors(IterationErrorPolicy::Abort)
///     .build();
/// assert_eq!(engine.iteration_errors(), IterationErrorPolicy::Abort);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    iteration_errors: IterationErrorPolicy,
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how failing vector-rule iterations are handled.
    #[must_use]
    pub fn iteration_errors(mut self, policy: IterationErrorPolicy) -> Self {
        self.iteration_errors = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            iteration_errors: self.iteration_errors,
        }
    }
}

/// Evaluates parsed rules against input documents.
///
/// Every call builds a fresh [`Context`], so one engine and one [`Rule`] can
/// serve any number of documents, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    iteration_errors: IterationErrorPolicy,
}

impl Engine {
    /// An engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    #[must_use]
    pub fn iteration_errors(&self) -> IterationErrorPolicy {
        self.iteration_errors
    }

    /// Evaluate `rule` against a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RulevalError::Input`] if `input` is not valid JSON and
    /// [`RulevalError::Eval`] if either evaluation pass fails.
    pub fn evaluate(&self, rule: &Rule, input: &[u8]) -> Result<Verdict, RulevalError> {
        let doc: serde_json::Value = serde_json::from_slice(input)?;
        Ok(self.evaluate_document(rule, &doc)?)
    }

    /// Evaluate `rule` against an already decoded document.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if either evaluation pass fails.
    pub fn evaluate_document<D: Document + ?Sized>(
        &self,
        rule: &Rule,
        doc: &D,
    ) -> Result<Verdict, EvalError> {
        let mut ctx = Context::new();
        self.run(rule, doc, &mut ctx, &mut Vec::new())
    }

    /// Evaluate with diagnostics: the verdict, the iterations of a vector
    /// rule that failed, the number of resolved bindings and timing.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate()`](Self::evaluate).
    pub fn evaluate_detailed(
        &self,
        rule: &Rule,
        input: &[u8],
    ) -> Result<EvaluationReport, RulevalError> {
        let start = Instant::now();
        let doc: serde_json::Value = serde_json::from_slice(input)?;
        let mut ctx = Context::new();
        let mut failures = Vec::new();
        let verdict = self.run(rule, &doc, &mut ctx, &mut failures)?;
        Ok(EvaluationReport::new(
            verdict,
            failures,
            ctx.len(),
            start.elapsed(),
        ))
    }

    fn run<D: Document + ?Sized>(
        &self,
        rule: &Rule,
        doc: &D,
        ctx: &mut Context,
        failures: &mut Vec<crate::IterationFailure>,
    ) -> Result<Verdict, EvalError> {
        debug!(vector = rule.is_vector(), "building context");
        rule.build_context(doc, ctx)?;
        let verdict = rule.evaluate_with(ctx, self.iteration_errors, failures)?;
        debug!(
            %verdict,
            bindings = ctx.len(),
            failures = failures.len(),
            "evaluated rule"
        );
        Ok(verdict)
    }
}
