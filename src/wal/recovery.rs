//! Log Recovery
//!
//! Rebuilds the index by replaying the log from an empty state.

use std::path::Path;

use tracing::Span;

use crate::error::{KvError, Result};
use crate::index::Index;

use super::{LogFile, LogReader};

/// Handles replay of the operation log
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records applied to the index
    pub entries_recovered: u64,

    /// Number of malformed lines skipped
    pub entries_corrupted: u64,

    /// Bytes of a torn final line cut when the log was opened
    pub truncated_bytes: u64,
}

impl WalRecovery {
    /// Replay every valid record of `log` into `index`.
    ///
    /// Later records override earlier ones for the same key. Malformed
    /// lines are logged under `span` and skipped; IO errors abort.
    pub fn replay_into(log: &LogFile, index: &mut Index, span: &Span) -> Result<RecoveryResult> {
        let mut result = RecoveryResult {
            truncated_bytes: log.truncated_bytes(),
            ..RecoveryResult::default()
        };

        if result.truncated_bytes > 0 {
            tracing::warn!(
                parent: span,
                bytes = result.truncated_bytes,
                "cut torn record from the end of the log"
            );
        }

        for item in log.replay()? {
            match item {
                Ok(record) => {
                    index.apply(record);
                    result.entries_recovered += 1;
                }
                Err(KvError::MalformedRecord { line, source }) => {
                    tracing::warn!(parent: span, line, reason = %source, "skipping malformed log record");
                    result.entries_corrupted += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            parent: span,
            recovered = result.entries_recovered,
            corrupted = result.entries_corrupted,
            live_keys = index.size(),
            "log replay complete"
        );

        Ok(result)
    }

    /// Scan a log file without modifying it or building an index
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();

        for item in LogReader::open(path)? {
            match item {
                Ok(_) => result.entries_recovered += 1,
                Err(KvError::MalformedRecord { .. }) => result.entries_corrupted += 1,
                Err(e) => return Err(e),
            }
        }

        Ok(result)
    }
}
