use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::condition::{Condition, LoopHeader};
use crate::parse::ParseError;

/// A parsed rule. Immutable once parsed and safe to share across threads;
/// all per-evaluation state lives in a [`Context`](super::Context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// `IF: { condition } THEN: { }`, evaluates to a single boolean.
    Scalar(ScalarRule),
    /// `FOR: i=start:end IF: ...`, one boolean per loop iteration.
    Vector(VectorRule),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRule {
    pub condition: Condition,
    pub action: Action,
}

/// The `THEN:` block. Reserved; always empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRule {
    pub header: LoopHeader,
    pub rule: ScalarRule,
}

impl Rule {
    /// Parse rule text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the text is not a well-formed rule.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        crate::parse::parse(input)
    }

    /// Read a file and parse the rule it contains.
    ///
    /// # Errors
    ///
    /// Returns [`RulevalError`](crate::RulevalError) on I/O or parse failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::RulevalError> {
        let input = std::fs::read_to_string(path)?;
        Ok(Self::parse(&input)?)
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        matches!(self, Rule::Vector(_))
    }
}

#[cfg(feature = "binary-cache")]
impl Rule {
    /// Serialize this rule to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata. Callers can use this to detect when the original
    /// rule text has changed and the cache should be rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a rule from a byte slice previously produced by
    /// [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this rule and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the rule it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl FromStr for Rule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScalarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF: {} THEN: {{ }}", self.condition)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Scalar(rule) => write!(f, "{rule}"),
            Rule::Vector(rule) => write!(f, "FOR: {} {}", rule.header, rule.rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Operator, ScalarCondition};

    fn amount_rule() -> ScalarRule {
        ScalarRule {
            condition: Condition::Scalar(ScalarCondition::binary(
                Operator::Ge,
                ScalarCondition::leaf("amount"),
                ScalarCondition::leaf("10000"),
            )),
            action: Action,
        }
    }

    #[test]
    fn display_scalar_rule() {
        let rule = Rule::Scalar(amount_rule());
        assert_eq!(rule.to_string(), "IF: { amount >= 10000 } THEN: { }");
        assert!(!rule.is_vector());
    }

    #[test]
    fn display_vector_rule() {
        let rule = Rule::Vector(VectorRule {
            header: LoopHeader {
                index_key: "i".into(),
                start_index: "0".into(),
                end_index: "txns.size()".into(),
            },
            rule: amount_rule(),
        });
        assert_eq!(
            rule.to_string(),
            "FOR: i=0:txns.size() IF: { amount >= 10000 } THEN: { }"
        );
        assert!(rule.is_vector());
    }

    #[test]
    fn from_str_parses() {
        let rule: Rule = "IF: { amount >= 10000 }".parse().unwrap();
        assert_eq!(rule, Rule::Scalar(amount_rule()));
    }
}
