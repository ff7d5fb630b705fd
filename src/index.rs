//! In-Memory Index
//!
//! The materialized current state: key → value, rebuilt from the log.
//!
//! ## Concurrency
//! The index carries no lock of its own. The engine guards it together
//! with the log append position under a single `RwLock`, so an index
//! update and its log append are one atomic unit.

use std::collections::HashMap;

use crate::error::{KvError, Result};
use crate::wal::Record;

/// Unordered key → value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: HashMap<String, String>,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Insert or overwrite; returns the previous value
    pub fn put(&mut self, key: String, value: String) -> Option<String> {
        self.entries.insert(key, value)
    }

    /// Remove a key; returns the removed value
    pub fn delete(&mut self, key: &str) -> Result<String> {
        self.entries
            .remove(key)
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy of every live pair
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.clone()
    }

    /// Apply a replayed record. A tombstone for an absent key is a no-op.
    pub fn apply(&mut self, record: Record) {
        match record {
            Record::Put { key, value } => {
                self.entries.insert(key, value);
            }
            Record::Delete { key } => {
                self.entries.remove(&key);
            }
        }
    }
}

impl FromIterator<Record> for Index {
    fn from_iter<I: IntoIterator<Item = Record>>(records: I) -> Self {
        let mut index = Index::new();
        for record in records {
            index.apply(record);
        }
        index
    }
}
