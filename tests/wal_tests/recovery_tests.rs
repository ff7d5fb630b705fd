//! Tests for log recovery
//!
//! These tests verify:
//! - Replay into an empty index (last write wins, tombstones remove)
//! - Malformed records are counted and skipped
//! - Torn tails are reported
//! - Verify mode (stats only, nothing modified)

use std::fs;
use std::path::PathBuf;

use logkv::config::SyncStrategy;
use logkv::index::Index;
use logkv::wal::{LogFile, Record, RecoveryResult, WalRecovery};
use tempfile::TempDir;
use tracing::Span;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("recovery.log");
    (temp_dir, path)
}

fn recover(path: &PathBuf) -> (Index, RecoveryResult) {
    let log = LogFile::open(path, SyncStrategy::EveryWrite).unwrap();
    let mut index = Index::new();
    let result = WalRecovery::replay_into(&log, &mut index, &Span::none()).unwrap();
    (index, result)
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_recover_empty_log() {
    let (_temp, path) = setup_temp_log();

    let (index, result) = recover(&path);

    assert!(index.is_empty());
    assert_eq!(result, RecoveryResult::default());
}

#[test]
fn test_recover_applies_in_order() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = LogFile::open(&path, SyncStrategy::EveryWrite).unwrap();
        log.append(&Record::put("k", "1")).unwrap();
        log.append(&Record::put("k", "2")).unwrap();
        log.append(&Record::put("gone", "x")).unwrap();
        log.append(&Record::delete("gone")).unwrap();
        log.append(&Record::delete("back")).unwrap();
        log.append(&Record::put("back", "again")).unwrap();
    }

    let (index, result) = recover(&path);

    assert_eq!(index.get("k").unwrap(), "2");
    assert!(index.get("gone").is_err());
    assert_eq!(index.get("back").unwrap(), "again");
    assert_eq!(index.size(), 2);
    assert_eq!(result.entries_recovered, 6);
    assert_eq!(result.entries_corrupted, 0);
}

#[test]
fn test_recover_matches_from_iterator() {
    let (_temp, path) = setup_temp_log();
    let records = vec![
        Record::put("a", "1"),
        Record::put("b", "2"),
        Record::delete("a"),
    ];
    {
        let mut log = LogFile::open(&path, SyncStrategy::EveryWrite).unwrap();
        for record in &records {
            log.append(record).unwrap();
        }
    }

    let (index, _) = recover(&path);

    assert_eq!(index, records.into_iter().collect::<Index>());
}

#[test]
fn test_recover_skips_malformed_records() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, "PUT,a,1\n\nPUT,onlyonefield\nXYZ,a\nPUT,b,2\nPUT,c,\\q\n").unwrap();

    let (index, result) = recover(&path);

    assert_eq!(index.get("a").unwrap(), "1");
    assert_eq!(index.get("b").unwrap(), "2");
    assert!(index.get("c").is_err());
    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.entries_corrupted, 4);
}

#[test]
fn test_recover_reports_truncated_tail() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, "PUT,a,1\nPUT,b,").unwrap();

    let (index, result) = recover(&path);

    assert_eq!(index.size(), 1);
    assert_eq!(result.truncated_bytes, 6);
    assert_eq!(result.entries_corrupted, 0);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_counts_without_modifying() {
    let (_temp, path) = setup_temp_log();
    let contents = "PUT,a,1\nBAD\nDEL,a\nPUT,torn";
    fs::write(&path, contents).unwrap();

    let result = WalRecovery::verify(&path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.entries_corrupted, 2);
    assert_eq!(result.truncated_bytes, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), contents);
}

#[test]
fn test_verify_missing_file_fails() {
    let (_temp, path) = setup_temp_log();

    assert!(WalRecovery::verify(&path).is_err());
}
