//! A small rule engine for JSON documents.
//!
//! Rules are written as text, parsed once into an immutable [`Rule`], and
//! evaluated against any number of documents. Evaluation runs in two passes:
//! every field path is first resolved from the document into a [`Context`],
//! then the condition tree is evaluated against that context alone.
//!
//! ```
//! use ruleval::{Engine, Rule, Verdict};
//!
//! let rule: Rule = r#"IF: { amount >= 10000 && type == "CREDIT_CARD" }"#.parse()?;
//! let engine = Engine::new();
//!
//! let verdict = engine.evaluate(&rule, br#"{"amount": 10000, "type": "CREDIT_CARD"}"#)?;
//! assert_eq!(verdict, Verdict::Scalar(true));
//!
//! let rule = Rule::parse("FOR: i=0:domino.size() IF: { domino[i].type == 10 }")?;
//! let verdict = engine.evaluate(&rule, br#"{"domino": [{"type": 10}, {"type": 9}]}"#)?;
//! assert_eq!(verdict.results(), [true, false]);
//! # Ok::<(), ruleval::RulevalError>(())
//! ```

mod engine;
mod error;
mod evaluate;
pub mod parse;
mod query;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use engine::{Engine, EngineBuilder, IterationErrorPolicy};
pub use error::RulevalError;
pub use parse::{parse, ParseError};
pub use query::Document;
pub use types::{
    is_operator, Action, Condition, Context, EvalError, EvaluationReport, IterationFailure,
    LoopFrame, LoopHeader, Operator, Rule, ScalarCondition, ScalarRule, Value, VectorCondition,
    VectorRule, Verdict, LENGTH_MARKER,
};
