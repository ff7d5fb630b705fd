//! Operation Log Module
//!
//! Provides durability through an append-only text log.
//!
//! ## Responsibilities
//! - Append a record before any in-memory mutation
//! - Replay records in file order on startup
//! - Skip malformed lines without aborting recovery
//! - Cut torn tails left by a crash mid-append
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ PUT,<key>,<value>\n                     │
//! ├─────────────────────────────────────────┤
//! │ DEL,<key>\n                             │
//! ├─────────────────────────────────────────┤
//! │ ...                                     │
//! └─────────────────────────────────────────┘
//! ```

mod entry;
mod log_file;
mod reader;
mod recovery;

pub use entry::{DecodeError, Record, DELETE_OPCODE, PUT_OPCODE};
pub use log_file::LogFile;
pub use reader::LogReader;
pub use recovery::{RecoveryResult, WalRecovery};
