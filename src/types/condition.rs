use std::fmt;

use serde::{Deserialize, Serialize};

use super::operator::Operator;
use super::value::Value;

/// Text appended to an array path in a loop header to ask for its length,
/// as in `FOR: i=0:domino.size()`.
pub const LENGTH_MARKER: &str = ".size()";

/// A parsed condition: either a plain boolean expression or a loop that
/// ANDs a sub-condition over an index range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Scalar(ScalarCondition),
    Vector(VectorCondition),
}

/// A binary expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarCondition {
    /// A literal or a field path to resolve against the input document.
    Leaf {
        value: Value,
        /// The path contains a bracketed loop variable, e.g. `domino[i].type`.
        has_array_index: bool,
    },
    Binary {
        operator: Operator,
        lhs: Box<ScalarCondition>,
        rhs: Box<ScalarCondition>,
    },
}

/// `name=start:end` of a `FOR:` loop.
///
/// `start_index` is an integer literal; `end_index` is an array path,
/// usually suffixed with [`LENGTH_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopHeader {
    pub index_key: String,
    pub start_index: String,
    pub end_index: String,
}

/// `FOR: i=start:end { condition }`: true when `condition` holds for every
/// `i` in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorCondition {
    pub header: LoopHeader,
    pub condition: Box<Condition>,
}

impl ScalarCondition {
    /// Build a leaf from a raw token, recognizing literals and flagging
    /// loop-indexed field paths.
    #[must_use]
    pub fn leaf(token: &str) -> Self {
        Self::from_value(Value::from_literal(token))
    }

    /// Build a leaf from an already typed value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let has_array_index = matches!(&value, Value::String(s) if has_array_index(s));
        ScalarCondition::Leaf {
            value,
            has_array_index,
        }
    }

    #[must_use]
    pub fn binary(operator: Operator, lhs: ScalarCondition, rhs: ScalarCondition) -> Self {
        ScalarCondition::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// The node's operator; [`Operator::Nil`] for leaves.
    #[must_use]
    pub fn operator(&self) -> Operator {
        match self {
            ScalarCondition::Leaf { .. } => Operator::Nil,
            ScalarCondition::Binary { operator, .. } => *operator,
        }
    }
}

impl LoopHeader {
    /// The array path whose length bounds the loop, without the length marker.
    #[must_use]
    pub fn array_path(&self) -> &str {
        self.end_index
            .strip_suffix(LENGTH_MARKER)
            .unwrap_or(&self.end_index)
    }
}

/// `true` for paths like `domino[i].type`.
fn has_array_index(path: &str) -> bool {
    path.contains('[') && path.contains(']')
}

impl fmt::Display for ScalarCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarCondition::Leaf { value, .. } => write!(f, "{value}"),
            ScalarCondition::Binary { operator, lhs, rhs } => {
                write!(f, "{lhs} {operator} {rhs}")
            }
        }
    }
}

impl fmt::Display for LoopHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.index_key, self.start_index, self.end_index)
    }
}

/// Canonical rule text: parsing the output yields an identical tree.
impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Scalar(c) => write!(f, "{{ {c} }}"),
            Condition::Vector(v) => write!(f, "{{ FOR: {} {} }}", v.header, v.condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_literals() {
        assert_eq!(
            ScalarCondition::leaf("10"),
            ScalarCondition::Leaf {
                value: Value::Int(10),
                has_array_index: false,
            }
        );
        assert_eq!(ScalarCondition::leaf("a").operator(), Operator::Nil);
        assert_eq!(
            ScalarCondition::from_value(Value::from("xs[i]")),
            ScalarCondition::leaf("xs[i]")
        );
    }

    #[test]
    fn leaf_flags_array_index() {
        assert_eq!(
            ScalarCondition::leaf("domino[i].type"),
            ScalarCondition::Leaf {
                value: Value::String("domino[i].type".into()),
                has_array_index: true,
            }
        );
        assert!(matches!(
            ScalarCondition::leaf("domino.type"),
            ScalarCondition::Leaf {
                has_array_index: false,
                ..
            }
        ));
    }

    #[test]
    fn array_path_strips_marker() {
        let header = LoopHeader {
            index_key: "i".into(),
            start_index: "0".into(),
            end_index: "domino.size()".into(),
        };
        assert_eq!(header.array_path(), "domino");
        assert_eq!(header.to_string(), "i=0:domino.size()");

        let bare = LoopHeader {
            end_index: "domino".into(),
            ..header
        };
        assert_eq!(bare.array_path(), "domino");
    }

    #[test]
    fn display_scalar() {
        let cond = Condition::Scalar(ScalarCondition::binary(
            Operator::And,
            ScalarCondition::binary(
                Operator::Eq,
                ScalarCondition::leaf("a"),
                ScalarCondition::leaf("10"),
            ),
            ScalarCondition::binary(
                Operator::Eq,
                ScalarCondition::leaf("c"),
                ScalarCondition::leaf("true"),
            ),
        ));
        assert_eq!(cond.to_string(), "{ a == 10 && c == true }");
    }

    #[test]
    fn display_vector() {
        let cond = Condition::Vector(VectorCondition {
            header: LoopHeader {
                index_key: "i".into(),
                start_index: "0".into(),
                end_index: "domino.size()".into(),
            },
            condition: Box::new(Condition::Scalar(ScalarCondition::binary(
                Operator::Eq,
                ScalarCondition::leaf("domino[i].type"),
                ScalarCondition::leaf("10"),
            ))),
        });
        assert_eq!(
            cond.to_string(),
            "{ FOR: i=0:domino.size() { domino[i].type == 10 } }"
        );
    }
}
