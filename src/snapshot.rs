//! Binary snapshots of a [`MemoryRuleStore`].
//!
//! A snapshot holds every stored rule plus the id and sequence counters, so
//! a restored store keeps allocating where the original left off. The format
//! is a 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RKIT"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The format version must match exactly; the engine version is informational.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::parse::MAX_TREE_DEPTH;
use crate::store::{Counters, MemoryRuleStore};
use crate::{AstNode, Comparator, Condition, Literal, LogicalOp, Rule, RuleId};

const MAGIC: &[u8; 4] = b"RKIT";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("not a rule store snapshot: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: snapshot is v{found}, engine supports v{supported}")]
    IncompatibleVersion { found: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// bincode cannot drive the tagged/untagged serde shapes used for JSON, so
// the payload has its own plain mirror types.

#[derive(Debug, Serialize, Deserialize)]
struct SerializedStore {
    metadata: StoreMetadata,
    rules: Vec<SerializedRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreMetadata {
    rule_count: usize,
    last_id: u64,
    sequence: u64,
    combined_sequence: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    id: u64,
    rule_text: String,
    is_combined: bool,
    sequence_number: Option<u64>,
    source_ids: Vec<u64>,
    ast: SerializedNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedNode {
    Condition {
        attribute: String,
        comparator: SerializedComparator,
        literal: SerializedLiteral,
    },
    And(Vec<SerializedNode>),
    Or(Vec<SerializedNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SerializedLiteral {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SerializedComparator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
}

impl From<Comparator> for SerializedComparator {
    fn from(comparator: Comparator) -> Self {
        match comparator {
            Comparator::Gt => Self::Gt,
            Comparator::Lt => Self::Lt,
            Comparator::Gte => Self::Gte,
            Comparator::Lte => Self::Lte,
            Comparator::Eq => Self::Eq,
        }
    }
}

impl From<SerializedComparator> for Comparator {
    fn from(comparator: SerializedComparator) -> Self {
        match comparator {
            SerializedComparator::Gt => Self::Gt,
            SerializedComparator::Lt => Self::Lt,
            SerializedComparator::Gte => Self::Gte,
            SerializedComparator::Lte => Self::Lte,
            SerializedComparator::Eq => Self::Eq,
        }
    }
}

impl From<&Literal> for SerializedLiteral {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Self::Number(*n),
            Literal::Text(s) => Self::Text(s.clone()),
        }
    }
}

impl From<SerializedLiteral> for Literal {
    fn from(literal: SerializedLiteral) -> Self {
        match literal {
            SerializedLiteral::Number(n) => Self::Number(n),
            SerializedLiteral::Text(s) => Self::Text(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree flattening (binary -> n-ary)
// ---------------------------------------------------------------------------

fn flatten(node: &AstNode) -> SerializedNode {
    match node {
        AstNode::Condition(condition) => SerializedNode::Condition {
            attribute: condition.attribute.clone(),
            comparator: condition.comparator.into(),
            literal: (&condition.literal).into(),
        },
        AstNode::Operator { op, .. } => {
            let mut children = Vec::new();
            collect_children(node, *op, &mut children);
            match op {
                LogicalOp::And => SerializedNode::And(children),
                LogicalOp::Or => SerializedNode::Or(children),
            }
        }
    }
}

// Only the left spine is merged. A same-operator right child stays a nested
// group, which keeps the restored tree identical to the stored one.
fn collect_children(node: &AstNode, group: LogicalOp, out: &mut Vec<SerializedNode>) {
    match node {
        AstNode::Operator { op, left, right } if *op == group => {
            collect_children(left, group, out);
            out.push(flatten(right));
        }
        other => out.push(flatten(other)),
    }
}

// ---------------------------------------------------------------------------
// Tree unflattening (n-ary -> binary)
// ---------------------------------------------------------------------------

fn unflatten(node: SerializedNode) -> Result<AstNode, SnapshotError> {
    let (op, children) = match node {
        SerializedNode::Condition {
            attribute,
            comparator,
            literal,
        } => {
            return Ok(AstNode::Condition(Condition::new(
                attribute,
                comparator.into(),
                Literal::from(literal),
            )));
        }
        SerializedNode::And(children) => (LogicalOp::And, children),
        SerializedNode::Or(children) => (LogicalOp::Or, children),
    };

    let mut iter = children.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| SnapshotError::Validation("empty And/Or group".to_owned()))?;
    let first = unflatten(first)?;
    iter.try_fold(first, |acc, child| {
        Ok(AstNode::operator(op, acc, unflatten(child)?))
    })
}

// ---------------------------------------------------------------------------
// Store <-> SerializedStore
// ---------------------------------------------------------------------------

fn store_to_serialized(store: &MemoryRuleStore) -> SerializedStore {
    let (rules, counters) = store.export();
    let rules: Vec<SerializedRule> = rules
        .iter()
        .map(|rule| SerializedRule {
            id: rule.id.0,
            rule_text: rule.rule_text.clone(),
            is_combined: rule.is_combined,
            sequence_number: rule.sequence_number,
            source_ids: rule.source_ids.iter().map(|id| id.0).collect(),
            ast: flatten(&rule.ast),
        })
        .collect();

    SerializedStore {
        metadata: StoreMetadata {
            rule_count: rules.len(),
            last_id: counters.last_id,
            sequence: counters.sequence,
            combined_sequence: counters.combined_sequence,
        },
        rules,
    }
}

fn serialized_to_store(ser: SerializedStore) -> Result<MemoryRuleStore, SnapshotError> {
    validate(&ser)?;

    let counters = Counters {
        last_id: ser.metadata.last_id,
        sequence: ser.metadata.sequence,
        combined_sequence: ser.metadata.combined_sequence,
    };
    let rules = ser
        .rules
        .into_iter()
        .map(|sr| {
            Ok(Rule {
                id: RuleId(sr.id),
                rule_text: sr.rule_text,
                ast: unflatten(sr.ast)?,
                is_combined: sr.is_combined,
                sequence_number: sr.sequence_number,
                source_ids: sr.source_ids.into_iter().map(RuleId).collect(),
            })
        })
        .collect::<Result<Vec<_>, SnapshotError>>()?;

    Ok(MemoryRuleStore::restore(rules, counters))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedStore) -> Result<(), SnapshotError> {
    let meta = &ser.metadata;
    if meta.rule_count != ser.rules.len() {
        return Err(SnapshotError::Validation(format!(
            "metadata says {} rules but payload has {}",
            meta.rule_count,
            ser.rules.len()
        )));
    }

    let mut ids = HashSet::with_capacity(ser.rules.len());
    for rule in &ser.rules {
        if !ids.insert(rule.id) {
            return Err(SnapshotError::Validation(format!(
                "rule id {} appears more than once",
                rule.id
            )));
        }
        if rule.id > meta.last_id {
            return Err(SnapshotError::Validation(format!(
                "rule id {} is beyond the id counter {}",
                rule.id, meta.last_id
            )));
        }
        if let Some(seq) = rule.sequence_number {
            let counter = if rule.is_combined {
                meta.combined_sequence
            } else {
                meta.sequence
            };
            if seq > counter {
                return Err(SnapshotError::Validation(format!(
                    "rule {} has sequence number {seq} beyond its counter {counter}",
                    rule.id
                )));
            }
        }
        let depth = validate_node(&rule.ast)?;
        if depth > MAX_TREE_DEPTH {
            return Err(SnapshotError::Validation(format!(
                "rule {} is {depth} levels deep, the limit is {MAX_TREE_DEPTH}",
                rule.id
            )));
        }
    }

    for rule in &ser.rules {
        if let Some(missing) = rule.source_ids.iter().find(|id| !ids.contains(id)) {
            return Err(SnapshotError::Validation(format!(
                "rule {} was combined from unknown rule {missing}",
                rule.id
            )));
        }
    }

    Ok(())
}

/// Checks groups are non-empty and returns the depth the rebuilt tree will have.
fn validate_node(node: &SerializedNode) -> Result<usize, SnapshotError> {
    match node {
        SerializedNode::Condition { .. } => Ok(1),
        SerializedNode::And(children) | SerializedNode::Or(children) => {
            let (first, rest) = children
                .split_first()
                .ok_or_else(|| SnapshotError::Validation("empty And/Or group".to_owned()))?;
            // Groups unflatten to a left spine: one level per extra child.
            rest.iter().try_fold(validate_node(first)?, |acc, child| {
                Ok(acc.max(validate_node(child)?) + 1)
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
}

fn read_header(bytes: &[u8]) -> Result<(u16, usize, [u8; 16]), SnapshotError> {
    if bytes.len() < HEADER_SIZE {
        return Err(SnapshotError::LengthMismatch {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] engine version, bytes[8..12] flags
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl MemoryRuleStore {
    /// Encode every rule and counter into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if the payload cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let serialized = store_to_serialized(self);
        let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        write_header(&mut buf, &payload);
        buf.extend_from_slice(&payload);
        debug!(
            rules = serialized.metadata.rule_count,
            bytes = buf.len(),
            "encoded rule store snapshot"
        );
        Ok(buf)
    }

    /// Restore a store from [`to_bytes`](Self::to_bytes) output.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the header, checksum, payload or
    /// validation checks fail.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (format_version, payload_len, stored_hash) = read_header(bytes)?;

        if format_version != FORMAT_VERSION {
            return Err(SnapshotError::IncompatibleVersion {
                found: format_version,
                supported: FORMAT_VERSION,
            });
        }

        let payload = &bytes[HEADER_SIZE..];
        if payload.len() < payload_len {
            return Err(SnapshotError::LengthMismatch {
                expected: payload_len,
                actual: payload.len(),
            });
        }
        let payload = &payload[..payload_len];

        if blake3::hash(payload).as_bytes()[..16] != stored_hash {
            warn!("rule store snapshot failed its integrity check");
            return Err(SnapshotError::ChecksumMismatch);
        }

        let (serialized, _): (SerializedStore, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
        let store = serialized_to_store(serialized)?;
        debug!(rules = store.len(), "restored rule store snapshot");
        Ok(store)
    }

    /// Write a snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] on encoding or I/O failure.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] on I/O failure or if the snapshot is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr;

    fn cond(name: &str) -> SerializedNode {
        SerializedNode::Condition {
            attribute: name.to_owned(),
            comparator: SerializedComparator::Eq,
            literal: SerializedLiteral::Number(1.0),
        }
    }

    fn rule(id: u64, seq: Option<u64>, is_combined: bool, source_ids: Vec<u64>) -> SerializedRule {
        SerializedRule {
            id,
            rule_text: "a = 1".to_owned(),
            is_combined,
            sequence_number: seq,
            source_ids,
            ast: cond("a"),
        }
    }

    fn store(rules: Vec<SerializedRule>, last_id: u64, sequence: u64) -> SerializedStore {
        SerializedStore {
            metadata: StoreMetadata {
                rule_count: rules.len(),
                last_id,
                sequence,
                combined_sequence: 1,
            },
            rules,
        }
    }

    #[test]
    fn comparator_round_trip() {
        for c in [
            Comparator::Gt,
            Comparator::Lt,
            Comparator::Gte,
            Comparator::Lte,
            Comparator::Eq,
        ] {
            assert_eq!(Comparator::from(SerializedComparator::from(c)), c);
        }
    }

    #[test]
    fn flatten_chained_and() {
        // And(And(a, b), c) -> And([a, b, c])
        let tree = attr("a").eq(1).and(attr("b").eq(1)).and(attr("c").eq(1));
        let flat = flatten(&tree);
        assert_eq!(flat, SerializedNode::And(vec![cond("a"), cond("b"), cond("c")]));
        assert_eq!(unflatten(flat).unwrap(), tree);
    }

    #[test]
    fn flatten_keeps_right_nested_group() {
        // And(a, And(b, c)) must not come back as And(And(a, b), c).
        let tree = attr("a").eq(1).and(attr("b").eq(1).and(attr("c").eq(1)));
        let flat = flatten(&tree);
        match &flat {
            SerializedNode::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[1], SerializedNode::And(inner) if inner.len() == 2));
            }
            other => panic!("expected And, got {other:?}"),
        }
        assert_eq!(unflatten(flat).unwrap(), tree);
    }

    #[test]
    fn flatten_mixed_stops_at_boundary() {
        // And(Or(a, b), c) -> And([Or([a, b]), c])
        let tree = attr("a").eq(1).or(attr("b").eq(1)).and(attr("c").eq(1));
        let flat = flatten(&tree);
        assert_eq!(
            flat,
            SerializedNode::And(vec![
                SerializedNode::Or(vec![cond("a"), cond("b")]),
                cond("c")
            ])
        );
    }

    #[test]
    fn unflatten_single_child_unwraps() {
        let node = SerializedNode::Or(vec![cond("a")]);
        assert_eq!(unflatten(node).unwrap(), attr("a").eq(1));
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (version, len, hash) = read_header(&buf).unwrap();
        assert_eq!(version, FORMAT_VERSION);
        assert_eq!(len, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"OOPS");
        assert!(matches!(read_header(&buf), Err(SnapshotError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            read_header(&[0u8; 10]),
            Err(SnapshotError::LengthMismatch {
                expected: HEADER_SIZE,
                actual: 10
            })
        ));
    }

    #[test]
    fn validate_accepts_consistent_store() {
        let ser = store(
            vec![rule(1, Some(1), false, vec![]), rule(2, Some(1), true, vec![1])],
            2,
            1,
        );
        assert!(validate(&ser).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let ser = store(
            vec![rule(1, Some(1), false, vec![]), rule(1, Some(2), false, vec![])],
            1,
            2,
        );
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));
    }

    #[test]
    fn validate_rejects_stale_counters() {
        let ser = store(vec![rule(3, Some(1), false, vec![])], 2, 1);
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));

        let ser = store(vec![rule(1, Some(5), false, vec![])], 1, 4);
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unknown_source() {
        let ser = store(vec![rule(1, Some(1), true, vec![9])], 1, 0);
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));
    }

    #[test]
    fn validate_rejects_empty_group() {
        let mut bad = rule(1, Some(1), false, vec![]);
        bad.ast = SerializedNode::And(vec![]);
        let ser = store(vec![bad], 1, 1);
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));
    }

    #[test]
    fn validate_rejects_overly_deep_tree() {
        let wide = |children: usize| {
            let mut r = rule(1, Some(1), false, vec![]);
            r.ast = SerializedNode::And(vec![cond("a"); children]);
            store(vec![r], 1, 1)
        };
        assert!(validate(&wide(MAX_TREE_DEPTH)).is_ok());
        assert!(matches!(
            validate(&wide(MAX_TREE_DEPTH + 1)),
            Err(SnapshotError::Validation(_))
        ));

        let nested = SerializedNode::Or(vec![cond("a"), SerializedNode::And(vec![cond("b"); 3])]);
        assert_eq!(validate_node(&nested).unwrap(), 4);
    }

    #[test]
    fn validate_rejects_rule_count_mismatch() {
        let mut ser = store(vec![rule(1, Some(1), false, vec![])], 1, 1);
        ser.metadata.rule_count = 2;
        assert!(matches!(validate(&ser), Err(SnapshotError::Validation(_))));
    }
}
