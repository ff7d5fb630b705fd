//! # LogKV
//!
//! An embedded key-value store with:
//! - An append-only operation log for durability
//! - Replay of the log into an in-memory index on startup
//! - One reader-writer lock covering the index and the log append
//! - A small TCP front end and interactive client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        RwLock<{ Index, LogFile }>  (shared / exclusive)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   LogFile   │ replay → │    Index    │
//!   │  (Append)   │          │  (HashMap)  │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod index;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, Outcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
