//! Index Tests
//!
//! Tests verify:
//! - Basic CRUD operations
//! - NotFound handling
//! - Snapshot isolation
//! - Record application (replay semantics)

use logkv::index::Index;
use logkv::wal::Record;
use logkv::KvError;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_index_is_empty() {
    let index = Index::new();
    assert_eq!(index.size(), 0);
    assert!(index.is_empty());
}

#[test]
fn test_put_and_get() {
    let mut index = Index::new();

    assert_eq!(index.put("key1".to_string(), "value1".to_string()), None);

    assert_eq!(index.get("key1").unwrap(), "value1");
    assert!(index.contains_key("key1"));
}

#[test]
fn test_put_overwrites_existing() {
    let mut index = Index::new();

    index.put("key".to_string(), "old".to_string());
    let previous = index.put("key".to_string(), "new".to_string());

    assert_eq!(previous.as_deref(), Some("old"));
    assert_eq!(index.get("key").unwrap(), "new");
    assert_eq!(index.size(), 1);
}

#[test]
fn test_get_missing_key() {
    let index = Index::new();

    assert!(matches!(index.get("missing"), Err(KvError::KeyNotFound(k)) if k == "missing"));
}

#[test]
fn test_delete() {
    let mut index = Index::new();
    index.put("key".to_string(), "value".to_string());

    assert_eq!(index.delete("key").unwrap(), "value");
    assert!(index.get("key").is_err());
    assert!(index.is_empty());
}

#[test]
fn test_delete_missing_key() {
    let mut index = Index::new();

    assert!(index.delete("missing").unwrap_err().is_not_found());
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_is_detached() {
    let mut index = Index::new();
    index.put("a".to_string(), "1".to_string());

    let snapshot = index.snapshot();
    index.put("a".to_string(), "2".to_string());
    index.put("b".to_string(), "3".to_string());

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["a"], "1");
}

// =============================================================================
// Apply Tests
// =============================================================================

#[test]
fn test_apply_put_then_delete() {
    let mut index = Index::new();

    index.apply(Record::put("k", "v"));
    index.apply(Record::delete("k"));

    assert!(index.is_empty());
}

#[test]
fn test_apply_delete_then_put_restores() {
    let mut index = Index::new();

    index.apply(Record::put("k", "v1"));
    index.apply(Record::delete("k"));
    index.apply(Record::put("k", "v2"));

    assert_eq!(index.get("k").unwrap(), "v2");
}

#[test]
fn test_apply_tombstone_for_absent_key() {
    let mut index = Index::new();

    index.apply(Record::delete("never-set"));

    assert!(index.is_empty());
}

#[test]
fn test_collect_records() {
    let index: Index = vec![
        Record::put("a", "1"),
        Record::put("b", "2"),
        Record::put("a", "3"),
    ]
    .into_iter()
    .collect();

    assert_eq!(index.size(), 2);
    assert_eq!(index.get("a").unwrap(), "3");
}
