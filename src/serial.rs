//! Binary serialization and deserialization of parsed rules.
//!
//! This module provides a stable binary format for caching a parsed
//! [`Rule`](crate::Rule) so that it can be loaded without re-parsing the rule
//! text. The format consists of a 32-byte fixed header followed by a
//! bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RVAL"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, bit 0 set for a vector rule)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parse::{MAX_EXPRESSION_DEPTH, MAX_LOOP_DEPTH};
use crate::types::{
    Action, Condition, LoopHeader, Operator, Rule, ScalarCondition, ScalarRule, Value,
    VectorCondition, VectorRule,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RVAL";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;
const FLAG_VECTOR: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`Rule`](crate::Rule) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("rule cannot be encoded: {0}")]
    Unencodable(&'static str),

    #[error("encoded payload of {0} bytes exceeds the format limit")]
    TooLarge(usize),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`Rule`](crate::Rule) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a ruleval binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRuleFile {
    metadata: RuleMetadata,
    rule: SerializedRule,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleMetadata {
    node_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedRule {
    Scalar(SerializedCondition),
    Vector {
        header: SerializedHeader,
        condition: SerializedCondition,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedHeader {
    index_key: String,
    start_index: String,
    end_index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedCondition {
    Scalar(SerializedExpr),
    Vector {
        header: SerializedHeader,
        condition: Box<SerializedCondition>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedExpr {
    Leaf(SerializedValue),
    Binary {
        op: SerializedOperator,
        lhs: Box<SerializedExpr>,
        rhs: Box<SerializedExpr>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedOperator {
    And,
    Or,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

// ---------------------------------------------------------------------------
// Operator / value conversion
// ---------------------------------------------------------------------------

fn serialize_op(op: Operator) -> Result<SerializedOperator, SerializeError> {
    match op {
        Operator::And => Ok(SerializedOperator::And),
        Operator::Or => Ok(SerializedOperator::Or),
        Operator::Eq => Ok(SerializedOperator::Eq),
        Operator::Ge => Ok(SerializedOperator::Ge),
        Operator::Gt => Ok(SerializedOperator::Gt),
        Operator::Le => Ok(SerializedOperator::Le),
        Operator::Lt => Ok(SerializedOperator::Lt),
        Operator::Nil => Err(SerializeError::Unencodable(
            "binary node carries the NIL operator",
        )),
    }
}

fn deserialize_op(op: SerializedOperator) -> Operator {
    match op {
        SerializedOperator::And => Operator::And,
        SerializedOperator::Or => Operator::Or,
        SerializedOperator::Eq => Operator::Eq,
        SerializedOperator::Ge => Operator::Ge,
        SerializedOperator::Gt => Operator::Gt,
        SerializedOperator::Le => Operator::Le,
        SerializedOperator::Lt => Operator::Lt,
    }
}

fn serialize_value(value: &Value) -> SerializedValue {
    match value {
        Value::Int(v) => SerializedValue::Int(*v),
        Value::Float(v) => SerializedValue::Float(*v),
        Value::Bool(v) => SerializedValue::Bool(*v),
        Value::String(v) => SerializedValue::Str(v.clone()),
    }
}

fn deserialize_value(value: SerializedValue) -> Value {
    match value {
        SerializedValue::Int(v) => Value::Int(v),
        SerializedValue::Float(v) => Value::Float(v),
        SerializedValue::Bool(v) => Value::Bool(v),
        SerializedValue::Str(v) => Value::String(v),
    }
}

// ---------------------------------------------------------------------------
// Rule -> SerializedRule
// ---------------------------------------------------------------------------

fn serialize_header(header: &LoopHeader) -> SerializedHeader {
    SerializedHeader {
        index_key: header.index_key.clone(),
        start_index: header.start_index.clone(),
        end_index: header.end_index.clone(),
    }
}

fn serialize_expr(expr: &ScalarCondition) -> Result<SerializedExpr, SerializeError> {
    match expr {
        ScalarCondition::Leaf { value, .. } => Ok(SerializedExpr::Leaf(serialize_value(value))),
        ScalarCondition::Binary { operator, lhs, rhs } => Ok(SerializedExpr::Binary {
            op: serialize_op(*operator)?,
            lhs: Box::new(serialize_expr(lhs)?),
            rhs: Box::new(serialize_expr(rhs)?),
        }),
    }
}

fn serialize_condition(condition: &Condition) -> Result<SerializedCondition, SerializeError> {
    match condition {
        Condition::Scalar(expr) => Ok(SerializedCondition::Scalar(serialize_expr(expr)?)),
        Condition::Vector(v) => Ok(SerializedCondition::Vector {
            header: serialize_header(&v.header),
            condition: Box::new(serialize_condition(&v.condition)?),
        }),
    }
}

fn rule_to_serialized(
    rule: &Rule,
    source_text: Option<&str>,
) -> Result<SerializedRuleFile, SerializeError> {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());

    let serialized = match rule {
        Rule::Scalar(r) => SerializedRule::Scalar(serialize_condition(&r.condition)?),
        Rule::Vector(r) => SerializedRule::Vector {
            header: serialize_header(&r.header),
            condition: serialize_condition(&r.rule.condition)?,
        },
    };

    Ok(SerializedRuleFile {
        metadata: RuleMetadata {
            node_count: count_rule(&serialized),
            source_digest,
        },
        rule: serialized,
    })
}

// ---------------------------------------------------------------------------
// SerializedRule -> Rule
// ---------------------------------------------------------------------------

fn deserialize_header(header: SerializedHeader) -> LoopHeader {
    LoopHeader {
        index_key: header.index_key,
        start_index: header.start_index,
        end_index: header.end_index,
    }
}

fn deserialize_expr(expr: SerializedExpr) -> ScalarCondition {
    match expr {
        SerializedExpr::Leaf(value) => ScalarCondition::from_value(deserialize_value(value)),
        SerializedExpr::Binary { op, lhs, rhs } => ScalarCondition::binary(
            deserialize_op(op),
            deserialize_expr(*lhs),
            deserialize_expr(*rhs),
        ),
    }
}

fn deserialize_condition(condition: SerializedCondition) -> Condition {
    match condition {
        SerializedCondition::Scalar(expr) => Condition::Scalar(deserialize_expr(expr)),
        SerializedCondition::Vector { header, condition } => Condition::Vector(VectorCondition {
            header: deserialize_header(header),
            condition: Box::new(deserialize_condition(*condition)),
        }),
    }
}

fn serialized_to_rule(ser: SerializedRuleFile) -> Result<Rule, DeserializeError> {
    validate(&ser)?;

    let rule = match ser.rule {
        SerializedRule::Scalar(condition) => Rule::Scalar(ScalarRule {
            condition: deserialize_condition(condition),
            action: Action,
        }),
        SerializedRule::Vector { header, condition } => Rule::Vector(VectorRule {
            header: deserialize_header(header),
            rule: ScalarRule {
                condition: deserialize_condition(condition),
                action: Action,
            },
        }),
    };
    Ok(rule)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn count_rule(rule: &SerializedRule) -> usize {
    match rule {
        SerializedRule::Scalar(c) => count_condition(c),
        SerializedRule::Vector { condition, .. } => 1 + count_condition(condition),
    }
}

fn count_condition(condition: &SerializedCondition) -> usize {
    match condition {
        SerializedCondition::Scalar(expr) => count_expr(expr),
        SerializedCondition::Vector { condition, .. } => 1 + count_condition(condition),
    }
}

fn count_expr(expr: &SerializedExpr) -> usize {
    match expr {
        SerializedExpr::Leaf(_) => 1,
        SerializedExpr::Binary { lhs, rhs, .. } => 1 + count_expr(lhs) + count_expr(rhs),
    }
}

fn validate(ser: &SerializedRuleFile) -> Result<(), DeserializeError> {
    match &ser.rule {
        SerializedRule::Scalar(condition) => validate_condition(condition, 0)?,
        SerializedRule::Vector { header, condition } => {
            validate_header(header)?;
            validate_condition(condition, 0)?;
        }
    }

    let actual = count_rule(&ser.rule);
    if actual != ser.metadata.node_count {
        return Err(DeserializeError::Validation(format!(
            "metadata node_count {} does not match actual {actual}",
            ser.metadata.node_count
        )));
    }
    Ok(())
}

fn validate_header(header: &SerializedHeader) -> Result<(), DeserializeError> {
    if header.index_key.is_empty() || header.end_index.is_empty() {
        return Err(DeserializeError::Validation(format!(
            "loop header '{}={}:{}' has an empty part",
            header.index_key, header.start_index, header.end_index
        )));
    }
    if header.start_index.parse::<i64>().is_err() {
        return Err(DeserializeError::Validation(format!(
            "loop start index '{}' is not an integer",
            header.start_index
        )));
    }
    Ok(())
}

fn validate_condition(
    condition: &SerializedCondition,
    loops: usize,
) -> Result<(), DeserializeError> {
    match condition {
        SerializedCondition::Scalar(expr) => validate_expr(expr, 1),
        SerializedCondition::Vector { .. } if loops == MAX_LOOP_DEPTH => Err(
            DeserializeError::Validation(format!("loops nest deeper than {MAX_LOOP_DEPTH}")),
        ),
        SerializedCondition::Vector { header, condition } => {
            validate_header(header)?;
            validate_condition(condition, loops + 1)
        }
    }
}

fn validate_expr(expr: &SerializedExpr, depth: usize) -> Result<(), DeserializeError> {
    if depth > MAX_EXPRESSION_DEPTH {
        return Err(DeserializeError::Validation(format!(
            "expression nests deeper than {MAX_EXPRESSION_DEPTH}"
        )));
    }
    match expr {
        SerializedExpr::Leaf(SerializedValue::Str(s)) if s.is_empty() => Err(
            DeserializeError::Validation("empty string leaf".to_owned()),
        ),
        SerializedExpr::Leaf(_) => Ok(()),
        SerializedExpr::Binary { lhs, rhs, .. } => {
            validate_expr(lhs, depth + 1)?;
            validate_expr(rhs, depth + 1)
        }
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8], flags: u32) -> Result<(), SerializeError> {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
    Ok(())
}

struct Header {
    format_version: u16,
    flags: u32,
    payload_len: u32,
    hash: [u8; 16],
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<Header, DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational)
    let flags = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok(Header {
        format_version,
        flags,
        payload_len,
        hash,
    })
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(rule: &Rule, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
    let serialized = rule_to_serialized(rule, source_text)?;
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;
    let flags = if rule.is_vector() { FLAG_VECTOR } else { 0 };

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload, flags)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

fn decode_file(bytes: &[u8]) -> Result<(Header, SerializedRuleFile), DeserializeError> {
    let header = read_header(bytes)?;

    if header.format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: header.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_end = HEADER_SIZE + header.payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: header.payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != header.hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedRuleFile, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    Ok((header, serialized))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Rule, DeserializeError> {
    let (header, serialized) = decode_file(bytes)?;
    let vector = matches!(serialized.rule, SerializedRule::Vector { .. });
    if vector != (header.flags & FLAG_VECTOR != 0) {
        return Err(DeserializeError::Validation(
            "header flags disagree with the rule kind".to_owned(),
        ));
    }
    serialized_to_rule(serialized)
}

/// BLAKE3 digest of the source text embedded by
/// [`Rule::to_bytes`](crate::Rule::to_bytes), if one was given.
///
/// Compare it with [`digest`] of the current source to decide whether a
/// cached rule is stale.
///
/// # Errors
///
/// Returns [`DeserializeError`] if `bytes` is not a valid rule binary.
pub fn source_digest(bytes: &[u8]) -> Result<Option<[u8; 32]>, DeserializeError> {
    let (_, serialized) = decode_file(bytes)?;
    Ok(serialized.metadata.source_digest)
}

/// BLAKE3 digest of rule source text, as stored in a rule binary.
#[must_use]
pub fn digest(source_text: &str) -> [u8; 32] {
    *blake3::hash(source_text.as_bytes()).as_bytes()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_round_trip() {
        let ops = [
            Operator::And,
            Operator::Or,
            Operator::Eq,
            Operator::Ge,
            Operator::Gt,
            Operator::Le,
            Operator::Lt,
        ];
        for op in ops {
            assert_eq!(deserialize_op(serialize_op(op).unwrap()), op);
        }
    }

    #[test]
    fn nil_operator_is_unencodable() {
        assert!(matches!(
            serialize_op(Operator::Nil),
            Err(SerializeError::Unencodable(_))
        ));
    }

    #[test]
    fn value_round_trip() {
        for v in [
            Value::Int(42),
            Value::Float(3.25),
            Value::Bool(true),
            Value::String("domino[i].type".to_owned()),
        ] {
            assert_eq!(deserialize_value(serialize_value(&v)), v);
        }
    }

    #[test]
    fn leaf_array_index_flag_is_recomputed() {
        let expr = SerializedExpr::Leaf(SerializedValue::Str("xs[i]".into()));
        assert!(matches!(
            deserialize_expr(expr),
            ScalarCondition::Leaf {
                has_array_index: true,
                ..
            }
        ));
    }

    #[test]
    fn node_count() {
        let rule = Rule::parse("FOR: i=0:xs.size() IF: { xs[i] == 1 && b }").unwrap();
        let ser = rule_to_serialized(&rule, None).unwrap();
        // loop + And + Eq + 2 leaves + 1 leaf
        assert_eq!(ser.metadata.node_count, 6);
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload, FLAG_VECTOR).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let header = read_header(&buf).unwrap();
        assert_eq!(header.format_version, FORMAT_VERSION);
        assert_eq!(header.flags, FLAG_VECTOR);
        assert_eq!(header.payload_len as usize, payload.len());

        let expected_hash = blake3::hash(payload);
        assert_eq!(&header.hash, &expected_hash.as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BAAD");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            read_header(&buf),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn validate_bad_start_index() {
        let header = SerializedHeader {
            index_key: "i".into(),
            start_index: "zero".into(),
            end_index: "xs.size()".into(),
        };
        assert!(matches!(
            validate_header(&header),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn validate_empty_header_part() {
        let header = SerializedHeader {
            index_key: String::new(),
            start_index: "0".into(),
            end_index: "xs.size()".into(),
        };
        assert!(matches!(
            validate_header(&header),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn validate_empty_leaf() {
        let expr = SerializedExpr::Leaf(SerializedValue::Str(String::new()));
        assert!(matches!(
            validate_expr(&expr, 1),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn validate_expression_depth() {
        let chain = |depth: usize| {
            let mut expr = SerializedExpr::Leaf(SerializedValue::Bool(true));
            for _ in 1..depth {
                expr = SerializedExpr::Binary {
                    op: SerializedOperator::And,
                    lhs: Box::new(SerializedExpr::Leaf(SerializedValue::Bool(true))),
                    rhs: Box::new(expr),
                };
            }
            expr
        };
        assert!(validate_expr(&chain(MAX_EXPRESSION_DEPTH), 1).is_ok());
        assert!(matches!(
            validate_expr(&chain(MAX_EXPRESSION_DEPTH + 1), 1),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn flags_must_match_rule_kind() {
        let rule = Rule::parse("IF: { a == 1 }").unwrap();
        let mut bytes = encode(&rule, None).unwrap();
        bytes[8] = 1;
        assert!(matches!(
            decode(&bytes),
            Err(DeserializeError::Validation(_))
        ));
    }
}
