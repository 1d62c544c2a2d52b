use std::borrow::Cow;

use tracing::{trace, warn};

use crate::engine::IterationErrorPolicy;
use crate::query::Document;
use crate::types::{
    Condition, Context, EvalError, IterationFailure, LoopFrame, LoopHeader, Rule, ScalarCondition,
    ScalarRule, Value, VectorCondition, VectorRule, Verdict,
};

// -- Build-context pass -----------------------------------------------------

impl Rule {
    /// Resolve every field path the rule mentions against `doc` and bind the
    /// results in `ctx`, including one binding per loop iteration.
    ///
    /// # Errors
    ///
    /// Document query failures are fatal: [`EvalError::PathNotFound`] or
    /// [`EvalError::NotAnArray`] for a loop bound, [`EvalError::UnsupportedType`]
    /// for a non-scalar leaf, [`EvalError::InvalidIndex`] for a bad start index.
    pub fn build_context<D: Document + ?Sized>(
        &self,
        doc: &D,
        ctx: &mut Context,
    ) -> Result<(), EvalError> {
        match self {
            Rule::Scalar(rule) => rule.condition.build_context(doc, ctx),
            Rule::Vector(rule) => rule.build_context(doc, ctx),
        }
    }
}

impl VectorRule {
    fn build_context<D: Document + ?Sized>(
        &self,
        doc: &D,
        ctx: &mut Context,
    ) -> Result<(), EvalError> {
        let frame = resolve_bounds(&self.header, doc, ctx)?;
        let (start, end) = (frame.start, frame.end);
        in_loop(ctx, frame, |ctx| {
            for i in start..end {
                ctx.set_current_index(i);
                self.rule.condition.build_context(doc, ctx)?;
            }
            Ok(())
        })
    }
}

impl Condition {
    /// Resolve the condition's field paths into `ctx`.
    ///
    /// # Errors
    ///
    /// See [`Rule::build_context`].
    pub fn build_context<D: Document + ?Sized>(
        &self,
        doc: &D,
        ctx: &mut Context,
    ) -> Result<(), EvalError> {
        match self {
            Condition::Scalar(c) => c.build_context(doc, ctx),
            Condition::Vector(v) => v.build_context(doc, ctx),
        }
    }
}

impl VectorCondition {
    fn build_context<D: Document + ?Sized>(
        &self,
        doc: &D,
        ctx: &mut Context,
    ) -> Result<(), EvalError> {
        let frame = resolve_bounds(&self.header, doc, ctx)?;
        let (start, end) = (frame.start, frame.end);
        in_loop(ctx, frame, |ctx| {
            for i in start..end {
                ctx.set_current_index(i);
                trace!(index = i, header = %self.header, "building loop iteration");
                self.condition.build_context(doc, ctx)?;
            }
            Ok(())
        })
    }
}

impl ScalarCondition {
    /// Resolve the leaves of this expression into `ctx`. Literal leaves need
    /// no resolution.
    ///
    /// # Errors
    ///
    /// See [`Rule::build_context`].
    pub fn build_context<D: Document + ?Sized>(
        &self,
        doc: &D,
        ctx: &mut Context,
    ) -> Result<(), EvalError> {
        match self {
            ScalarCondition::Leaf {
                value: Value::String(path),
                has_array_index,
            } => {
                let key = effective_key(path, *has_array_index, ctx);
                let value = match doc.lookup(&key)? {
                    Some(value) => value,
                    None => Value::String(unquote(&key).to_owned()),
                };
                trace!(key = %key, value = %value, "resolved binding");
                ctx.insert(key.into_owned(), value);
                Ok(())
            }
            ScalarCondition::Leaf { .. } => Ok(()),
            ScalarCondition::Binary { lhs, rhs, .. } => {
                lhs.build_context(doc, ctx)?;
                rhs.build_context(doc, ctx)
            }
        }
    }
}

// -- Evaluate pass ----------------------------------------------------------

impl Rule {
    /// Evaluate against a context filled by [`build_context`](Self::build_context).
    ///
    /// A failing iteration of a vector rule is recorded as `false` and
    /// logged; use [`Engine`](crate::Engine) to choose another policy or to
    /// collect the failures.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when an operator is applied to mismatched
    /// operands, a condition does not produce a boolean, or a field was not
    /// bound by the build pass.
    pub fn evaluate(&self, ctx: &mut Context) -> Result<Verdict, EvalError> {
        self.evaluate_with(ctx, IterationErrorPolicy::default(), &mut Vec::new())
    }

    pub(crate) fn evaluate_with(
        &self,
        ctx: &mut Context,
        policy: IterationErrorPolicy,
        failures: &mut Vec<IterationFailure>,
    ) -> Result<Verdict, EvalError> {
        match self {
            Rule::Scalar(rule) => rule.evaluate(ctx).map(Verdict::Scalar),
            Rule::Vector(rule) => rule.evaluate(ctx, policy, failures).map(Verdict::Vector),
        }
    }
}

impl ScalarRule {
    fn evaluate(&self, ctx: &mut Context) -> Result<bool, EvalError> {
        self.condition.evaluate(ctx)
    }
}

impl VectorRule {
    fn evaluate(
        &self,
        ctx: &mut Context,
        policy: IterationErrorPolicy,
        failures: &mut Vec<IterationFailure>,
    ) -> Result<Vec<bool>, EvalError> {
        let frame = stored_bounds(&self.header, ctx)?;
        let (start, end) = (frame.start, frame.end);
        in_loop(ctx, frame, |ctx| {
            let mut results = Vec::new();
            for i in start..end {
                ctx.set_current_index(i);
                match self.rule.evaluate(ctx) {
                    Ok(result) => {
                        trace!(index = i, result, "vector rule iteration");
                        results.push(result);
                    }
                    Err(error) => match policy {
                        IterationErrorPolicy::Abort => return Err(error),
                        IterationErrorPolicy::RecordFalse => {
                            warn!(index = i, %error, "vector rule iteration failed, recording false");
                            failures.push(IterationFailure { index: i, error });
                            results.push(false);
                        }
                    },
                }
            }
            Ok(results)
        })
    }
}

impl Condition {
    /// Evaluate the condition to a boolean.
    ///
    /// # Errors
    ///
    /// See [`Rule::evaluate`]. Unlike a vector rule, a vector condition
    /// stops at the first failing iteration.
    pub fn evaluate(&self, ctx: &mut Context) -> Result<bool, EvalError> {
        match self {
            Condition::Scalar(c) => {
                let value = c.evaluate(ctx)?;
                value.as_bool().ok_or(EvalError::NotBoolean {
                    found: value.type_name(),
                })
            }
            Condition::Vector(v) => v.evaluate(ctx),
        }
    }
}

impl VectorCondition {
    /// AND of the inner condition over every index; `true` for an empty range.
    fn evaluate(&self, ctx: &mut Context) -> Result<bool, EvalError> {
        let frame = stored_bounds(&self.header, ctx)?;
        let (start, end) = (frame.start, frame.end);
        in_loop(ctx, frame, |ctx| {
            let mut all = true;
            for i in start..end {
                ctx.set_current_index(i);
                all &= self.condition.evaluate(ctx)?;
            }
            Ok(all)
        })
    }
}

impl ScalarCondition {
    /// Evaluate the expression. Leaves yield their bound or literal value,
    /// operator nodes yield a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Unbound`] for a field the build pass did not
    /// resolve and [`EvalError::TypeMismatch`] for operands of differing types.
    pub fn evaluate(&self, ctx: &Context) -> Result<Value, EvalError> {
        match self {
            ScalarCondition::Leaf {
                value: Value::String(path),
                has_array_index,
            } => {
                let key = effective_key(path, *has_array_index, ctx);
                ctx.get(&key).cloned().ok_or_else(|| EvalError::Unbound {
                    key: key.into_owned(),
                })
            }
            ScalarCondition::Leaf { value, .. } => Ok(value.clone()),
            ScalarCondition::Binary { operator, lhs, rhs } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                operator.apply(&lhs, &rhs).map(Value::Bool)
            }
        }
    }
}

// -- Helpers ----------------------------------------------------------------

/// The document path a leaf resolves to in the current iteration. For each
/// active loop, innermost first, the first `[<index>]` becomes `.<current>`.
fn effective_key<'a>(path: &'a str, has_array_index: bool, ctx: &Context) -> Cow<'a, str> {
    if !has_array_index {
        return Cow::Borrowed(path);
    }
    ctx.frames().fold(Cow::Borrowed(path), |key, frame| {
        let pattern = format!("[{}]", frame.index_key);
        if key.contains(&pattern) {
            Cow::Owned(key.replacen(&pattern, &format!(".{}", frame.current), 1))
        } else {
            key
        }
    })
}

/// Literal text of an unresolved leaf, without one pair of surrounding quotes.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Key under which a header's bounds are stored. The array path is rewritten
/// like a leaf so that an inner loop over `a[i].b` gets bounds per outer index.
fn bounds_key(header: &LoopHeader, ctx: &Context) -> String {
    let path = effective_key(header.array_path(), true, ctx);
    format!("{}={}:{}", header.index_key, header.start_index, path)
}

fn resolve_bounds<D: Document + ?Sized>(
    header: &LoopHeader,
    doc: &D,
    ctx: &mut Context,
) -> Result<LoopFrame, EvalError> {
    let start = header
        .start_index
        .parse::<i64>()
        .ok()
        .filter(|start| *start >= 0)
        .ok_or_else(|| EvalError::InvalidIndex {
            index: header.start_index.clone(),
        })?;
    let path = effective_key(header.array_path(), true, ctx).into_owned();
    let length = doc.length(&path)?;
    let end = i64::try_from(length).map_err(|_| EvalError::InvalidIndex {
        index: length.to_string(),
    })?;
    trace!(header = %header, start, end, "resolved loop bounds");
    let key = bounds_key(header, ctx);
    ctx.set_bounds(key, start, end);
    Ok(loop_frame(header, start, end))
}

fn stored_bounds(header: &LoopHeader, ctx: &Context) -> Result<LoopFrame, EvalError> {
    let key = bounds_key(header, ctx);
    let (start, end) = ctx.bounds(&key).ok_or(EvalError::Unbound { key })?;
    Ok(loop_frame(header, start, end))
}

fn loop_frame(header: &LoopHeader, start: i64, end: i64) -> LoopFrame {
    LoopFrame {
        index_key: header.index_key.clone(),
        start,
        end,
        current: start,
    }
}

/// Run `body` with `frame` as the innermost loop, leaving it afterwards
/// whether or not `body` fails.
fn in_loop<T>(
    ctx: &mut Context,
    frame: LoopFrame,
    body: impl FnOnce(&mut Context) -> Result<T, EvalError>,
) -> Result<T, EvalError> {
    ctx.enter_loop(frame);
    let result = body(ctx);
    ctx.leave_loop();
    result
}
