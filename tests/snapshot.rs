#![cfg(feature = "snapshot")]

use rulekit::{DataContext, MemoryRuleStore, RuleEngine, RuleFilter, RuleStore, SnapshotError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn populated_store() -> MemoryRuleStore {
    let engine = RuleEngine::new(MemoryRuleStore::new());
    let a = engine
        .create_rule("(age > 30 AND dept = 'Sales') OR (age < 25 AND dept = 'Marketing')")
        .unwrap();
    let b = engine
        .create_rule("salary > 50000.5 OR experience > 5")
        .unwrap();
    let c = engine.create_rule("x = 1 AND (y = 2 AND z = 3)").unwrap();
    engine.combine_rules(&[a.id, b.id]).unwrap();
    engine.combine_rules(&[b.id, c.id]).unwrap();
    engine.into_store()
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_rules() {
    let store = populated_store();
    let bytes = store.to_bytes().unwrap();
    let restored = MemoryRuleStore::from_bytes(&bytes).unwrap();

    assert_eq!(
        restored.find_all(RuleFilter::all()).unwrap(),
        store.find_all(RuleFilter::all()).unwrap()
    );
}

#[test]
fn restored_store_keeps_counting() {
    let restored = MemoryRuleStore::from_bytes(&populated_store().to_bytes().unwrap()).unwrap();
    let engine = RuleEngine::new(restored);

    let next = engine.create_rule("w = 1").unwrap();
    assert_eq!(next.sequence_number, Some(4));
    assert_eq!(next.id.0, 6);

    let rules = engine.rules().unwrap();
    let combined = engine.combine_rules(&[rules[0].id, next.id]).unwrap();
    assert_eq!(combined.sequence_number, Some(3));
}

#[test]
fn restored_store_evaluates_the_same() {
    let engine = RuleEngine::new(populated_store());
    let restored = RuleEngine::new(
        MemoryRuleStore::from_bytes(&engine.store().to_bytes().unwrap()).unwrap(),
    );

    for json in [
        r#"{"age": 35, "dept": "Sales", "salary": 60000}"#,
        r#"{"age": 35, "dept": "Sales", "salary": 100}"#,
        r#"{"salary": 60000, "x": 1, "y": 2, "z": 3}"#,
        r#"{}"#,
    ] {
        assert_eq!(
            engine.evaluate_json(json).unwrap(),
            restored.evaluate_json(json).unwrap(),
            "{json}"
        );
    }
    let ctx = DataContext::new()
        .set("salary", 60000)
        .set("x", 1)
        .set("y", 2)
        .set("z", 3);
    assert!(restored.evaluate(&ctx).unwrap());
}

#[test]
fn empty_store_round_trips() {
    let bytes = MemoryRuleStore::new().to_bytes().unwrap();
    let restored = MemoryRuleStore::from_bytes(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.next_sequence_number().unwrap(), 1);
}

#[test]
fn encoding_is_deterministic() {
    let store = populated_store();
    assert_eq!(store.to_bytes().unwrap(), store.to_bytes().unwrap());
}

#[test]
fn file_round_trip() {
    let dir = std::env::temp_dir().join("rulekit_snapshot_file");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("rules.rkit");

    let store = populated_store();
    store.to_file(&path).unwrap();
    let restored = MemoryRuleStore::from_file(&path).unwrap();
    assert_eq!(restored.len(), store.len());

    std::fs::remove_dir_all(&dir).ok();
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn flipped_payload_byte_fails_checksum() {
    let mut bytes = populated_store().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        MemoryRuleStore::from_bytes(&bytes),
        Err(SnapshotError::ChecksumMismatch)
    ));
}

#[test]
fn wrong_magic() {
    let mut bytes = populated_store().to_bytes().unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    assert!(matches!(
        MemoryRuleStore::from_bytes(&bytes),
        Err(SnapshotError::BadMagic)
    ));
}

#[test]
fn future_format_version() {
    let mut bytes = populated_store().to_bytes().unwrap();
    bytes[4..6].copy_from_slice(&99u16.to_le_bytes());
    assert!(matches!(
        MemoryRuleStore::from_bytes(&bytes),
        Err(SnapshotError::IncompatibleVersion {
            found: 99,
            supported: 1
        })
    ));
}

#[test]
fn truncated_payload() {
    let bytes = populated_store().to_bytes().unwrap();
    let cut = &bytes[..bytes.len() - 4];
    assert!(matches!(
        MemoryRuleStore::from_bytes(cut),
        Err(SnapshotError::LengthMismatch { .. })
    ));
    assert!(matches!(
        MemoryRuleStore::from_bytes(&bytes[..16]),
        Err(SnapshotError::LengthMismatch { .. })
    ));
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("rulekit_snapshot_missing/none.rkit");
    assert!(matches!(
        MemoryRuleStore::from_file(&path),
        Err(SnapshotError::Io(_))
    ));
}
