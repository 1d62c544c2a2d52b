mod condition;
mod context;
mod error;
mod evaluation_report;
mod operator;
mod rule;
mod value;
mod verdict;

pub use condition::{Condition, LoopHeader, ScalarCondition, VectorCondition, LENGTH_MARKER};
pub use context::{Context, LoopFrame};
pub use error::EvalError;
pub use evaluation_report::{EvaluationReport, IterationFailure};
pub use operator::{is_operator, Operator};
pub use rule::{Action, Rule, ScalarRule, VectorRule};
pub use value::Value;
pub use verdict::Verdict;
