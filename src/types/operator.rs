use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::EvalError;
use super::value::Value;

/// Logical and comparison operators. `Nil` marks a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `&&`, bool only.
    And,
    /// `||`, bool only.
    Or,
    /// `==`, every type.
    Eq,
    /// `>=`, int and float.
    Ge,
    /// `>`, int and float.
    Gt,
    /// `<=`, int and float.
    Le,
    /// `<`, int and float.
    Lt,
    /// No operator: the condition is a leaf carrying a value.
    Nil,
}

const LOGICAL_PRECEDENCE: u16 = 100;
const COMPARISON_PRECEDENCE: u16 = 1;

impl Operator {
    /// Map an operator token to its operator. Only the seven literal tokens
    /// `== >= > <= < && ||` are operators.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Operator> {
        match token {
            "&&" => Some(Operator::And),
            "||" => Some(Operator::Or),
            "==" => Some(Operator::Eq),
            ">=" => Some(Operator::Ge),
            ">" => Some(Operator::Gt),
            "<=" => Some(Operator::Le),
            "<" => Some(Operator::Lt),
            _ => None,
        }
    }

    /// The token this operator is written as.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Eq => "==",
            Operator::Ge => ">=",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Lt => "<",
            Operator::Nil => "NIL",
        }
    }

    /// Precedence tier used by the parser: 100 for `&&`/`||`, 1 for
    /// comparisons. `None` for [`Operator::Nil`], which is not an operator token.
    #[must_use]
    pub fn precedence(self) -> Option<u16> {
        match self {
            Operator::And | Operator::Or => Some(LOGICAL_PRECEDENCE),
            Operator::Nil => None,
            _ => Some(COMPARISON_PRECEDENCE),
        }
    }

    /// Apply the operator to two operands of the same tag.
    ///
    /// Operators a tag does not support evaluate to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::TypeMismatch`] when the operand tags differ.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
        if !lhs.same_type(rhs) {
            return Err(EvalError::TypeMismatch {
                operator: self.token().to_owned(),
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            });
        }
        Ok(match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => self.compare(a, b),
            (Value::Float(a), Value::Float(b)) => self.compare(a, b),
            (Value::String(a), Value::String(b)) => self == Operator::Eq && a == b,
            (Value::Bool(a), Value::Bool(b)) => match self {
                Operator::And => *a && *b,
                Operator::Or => *a || *b,
                Operator::Eq => a == b,
                _ => false,
            },
            _ => {
                return Err(EvalError::UnsupportedType {
                    found: lhs.type_name().to_owned(),
                })
            }
        })
    }

    fn compare<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        match self {
            Operator::Eq => a == b,
            Operator::Gt => a > b,
            Operator::Ge => a >= b,
            Operator::Lt => a < b,
            Operator::Le => a <= b,
            _ => false,
        }
    }
}

/// Returns `true` if `token` is one of the operator tokens.
#[must_use]
pub fn is_operator(token: &str) -> bool {
    token.len() <= 2 && Operator::from_token(token).is_some()
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
