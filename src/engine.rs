//! Engine Module
//!
//! The core storage engine that coordinates the log and the index.
//!
//! ## Responsibilities
//! - Replay the log into a fresh index on open
//! - Make every mutation durable before it becomes visible
//! - Handle concurrent read/write access
//! - Reject every operation once closed

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use tracing::Span;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::Index;
use crate::protocol::Command;
use crate::wal::{LogFile, Record, RecoveryResult, WalRecovery};

/// The main storage engine
///
/// ## Concurrency Model: one reader-writer lock
///
/// The index and the log append position form a single unit of state
/// behind one `RwLock`:
///
/// - **Reads** (get/size/enumerate): shared lock, run concurrently
/// - **Writes** (put/delete): exclusive lock held across the log append
///   *and* the index update, so no reader can see an update whose record
///   is not yet in the log, and no two mutations interleave
///
/// The lock holds `None` once the engine is closed.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Index + log, `None` after close
    state: RwLock<Option<State>>,

    /// Stats from the replay performed at open
    recovery: RecoveryResult,

    /// Every event the engine emits is parented to this span
    span: Span,
}

struct State {
    index: Index,
    log: LogFile,
}

/// Transport-neutral result of [`Engine::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Value read by GET
    Value(String),

    /// Snapshot from ENUMERATE, sorted by key
    Entries(Vec<(String, String)>),

    /// Live key count from SIZE
    Count(usize),

    /// Mutation applied
    Done,

    /// Reply to PING
    Pong,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// Events are emitted under a fresh `engine` span; use
    /// [`Engine::open_with_span`] to supply one.
    pub fn open(config: Config) -> Result<Self> {
        let span = tracing::info_span!("engine", log = %config.log_path.display());
        Self::open_with_span(config, span)
    }

    /// Open or create an engine whose events are parented to `span`
    ///
    /// On startup:
    /// 1. Open/create the log file (failure here is fatal)
    /// 2. Replay every valid record into an empty index
    /// 3. Ready to serve requests
    pub fn open_with_span(config: Config, span: Span) -> Result<Self> {
        config.validate()?;

        let log = LogFile::open(&config.log_path, config.sync_strategy).map_err(|e| {
            tracing::error!(parent: &span, error = %e, "failed to open log");
            e
        })?;

        let mut index = Index::new();
        let recovery = WalRecovery::replay_into(&log, &mut index, &span)?;

        Ok(Self {
            config,
            state: RwLock::new(Some(State { index, log })),
            recovery,
            span,
        })
    }

    /// Open with a log path (convenience method)
    ///
    /// Uses default config with the specified log file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().log_path(path.as_ref()).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Outcome> {
        match command {
            Command::Get { key } => self.get(&key).map(Outcome::Value),
            Command::Put { key, value } => self.put(&key, &value).map(|()| Outcome::Done),
            Command::Delete { key } => self.delete(&key).map(|()| Outcome::Done),
            Command::Enumerate => {
                let mut entries: Vec<_> = self.enumerate()?.into_iter().collect();
                entries.sort();
                Ok(Outcome::Entries(entries))
            }
            Command::Size => self.size().map(Outcome::Count),
            Command::Ping => Ok(Outcome::Pong),
        }
    }

    /// Get a value by key (index only, no log access)
    pub fn get(&self, key: &str) -> Result<String> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(KvError::Closed)?;
        state.index.get(key).map(str::to_owned)
    }

    /// Put a key-value pair
    ///
    /// Steps (exclusive lock held throughout):
    /// 1. Append to the log (durability guarantee)
    /// 2. Update the index
    ///
    /// If the append fails the index is untouched.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(KvError::Closed)?;

        state.log.append(&Record::put(key, value)).map_err(|e| {
            tracing::warn!(parent: &self.span, key, error = %e, "put failed to append");
            e
        })?;
        state.index.put(key.to_string(), value.to_string());

        tracing::debug!(parent: &self.span, key, "put");
        Ok(())
    }

    /// Delete a key
    ///
    /// A missing key fails with `KeyNotFound` and nothing is logged.
    /// Otherwise the tombstone is appended before the index entry is removed.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(KvError::Closed)?;

        if !state.index.contains_key(key) {
            return Err(KvError::KeyNotFound(key.to_string()));
        }

        state.log.append(&Record::delete(key)).map_err(|e| {
            tracing::warn!(parent: &self.span, key, error = %e, "delete failed to append");
            e
        })?;
        state.index.delete(key)?;

        tracing::debug!(parent: &self.span, key, "delete");
        Ok(())
    }

    /// Number of live keys
    pub fn size(&self) -> Result<usize> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(KvError::Closed)?;
        Ok(state.index.size())
    }

    /// Snapshot of every live pair, not a live view
    pub fn enumerate(&self) -> Result<HashMap<String, String>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(KvError::Closed)?;
        Ok(state.index.snapshot())
    }

    /// Close the engine
    ///
    /// Syncs and releases the log. Every later call, including another
    /// `close`, fails with `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.state.write();
        let mut state = guard.take().ok_or(KvError::Closed)?;

        state.log.close()?;

        tracing::info!(parent: &self.span, live_keys = state.index.size(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the log file path
    pub fn log_path(&self) -> &Path {
        &self.config.log_path
    }

    /// Current log length in bytes
    pub fn log_len(&self) -> Result<u64> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(KvError::Closed)?;
        Ok(state.log.len())
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }

    /// Stats of the replay performed at open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
