//! Log File Manager
//!
//! Owns the on-disk append-only log: appends records, replays them, and
//! cuts torn tails left behind by a crash mid-append.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{KvError, Result};

use super::{LogReader, Record};

/// Size of the blocks scanned backwards when looking for the last newline
const TAIL_SCAN_CHUNK: u64 = 4096;

/// Append-only operation log
///
/// The file handle is exclusively owned; `close()` releases it for good.
#[derive(Debug)]
pub struct LogFile {
    /// Path of the log on disk
    path: PathBuf,

    /// Read + append handle, `None` once closed
    file: Option<File>,

    /// Current append position (bytes of complete records)
    len: u64,

    sync_strategy: SyncStrategy,

    /// Appends written since the last fsync
    unsynced: usize,

    /// Bytes of a torn final line removed on open
    truncated_bytes: u64,

    /// Set when a failed append could not be rolled back; the file may end
    /// in a partial line, so nothing more may be appended until reopen
    poisoned: bool,

    #[cfg(test)]
    faults: Faults,
}

/// Failure points for exercising the error paths of `append`
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    /// Write only this many bytes of the next line, then fail
    write_limit: Option<usize>,

    /// Make the rollback after a failed write fail too
    fail_rollback: bool,
}

impl LogFile {
    /// Open or create the log at `path`.
    ///
    /// Missing parent directories are created. A final line without its
    /// terminating newline is a torn append and is truncated away.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let len = complete_len(&mut file, file_len)?;
        let truncated_bytes = file_len - len;

        if truncated_bytes > 0 {
            file.set_len(len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            len,
            sync_strategy,
            unsynced: 0,
            truncated_bytes,
            poisoned: false,
            #[cfg(test)]
            faults: Faults::default(),
        })
    }

    /// Append one record.
    ///
    /// Either the whole line lands in the file or the file is rolled back to
    /// its previous length and the IO error is returned. If the rollback
    /// itself fails the log is poisoned and refuses further appends.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.check_writable()?;

        let line = record.encode();
        let start = self.len;
        let sync_now = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };

        #[cfg(test)]
        let (write_limit, fail_rollback) = (self.faults.write_limit, self.faults.fail_rollback);
        #[cfg(not(test))]
        let (write_limit, fail_rollback) = (None, false);

        let file = self.file.as_mut().ok_or(KvError::Closed)?;

        if let Err(err) = write_line(file, line.as_bytes(), sync_now, write_limit) {
            if let Err(rollback) = truncate_to(file, start, fail_rollback) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial append, log is poisoned until reopened"
                );
                self.poisoned = true;
            }
            return Err(err.into());
        }

        self.len += line.len() as u64;
        self.unsynced = if sync_now { 0 } else { self.unsynced + 1 };

        Ok(())
    }

    /// Replay every record from the start of the file.
    ///
    /// Uses its own read handle, so the append position is irrelevant.
    pub fn replay(&self) -> Result<LogReader> {
        if self.file.is_none() {
            return Err(KvError::Closed);
        }
        LogReader::open(&self.path)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.check_writable()?;
        let file = self.file.as_mut().ok_or(KvError::Closed)?;
        file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Sync and release the file handle. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        self.unsynced = 0;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current append position in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Bytes cut from a torn final line when the log was opened
    pub fn truncated_bytes(&self) -> u64 {
        self.truncated_bytes
    }

    /// True after an append failed and its partial line could not be removed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn check_writable(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(KvError::Closed);
        }
        if self.poisoned {
            return Err(KvError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "log {} ends in a partial record, reopen to recover",
                    self.path.display()
                ),
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn fail_writes_after(&mut self, bytes: usize) {
        self.faults.write_limit = Some(bytes);
    }

    #[cfg(test)]
    pub(crate) fn fail_rollbacks(&mut self) {
        self.faults.fail_rollback = true;
    }

    #[cfg(test)]
    pub(crate) fn clear_faults(&mut self) {
        self.faults = Faults::default();
    }
}

fn write_line(file: &mut File, line: &[u8], sync: bool, limit: Option<usize>) -> io::Result<()> {
    if let Some(limit) = limit.filter(|&limit| limit < line.len()) {
        file.write_all(&line[..limit])?;
        return Err(io::Error::new(io::ErrorKind::Other, "write interrupted"));
    }

    file.write_all(line)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

fn truncate_to(file: &File, len: u64, fail: bool) -> io::Result<()> {
    if fail {
        return Err(io::Error::new(io::ErrorKind::Other, "truncate refused"));
    }
    file.set_len(len)
}

/// Length of the prefix of the file that ends with a newline
fn complete_len(file: &mut File, file_len: u64) -> io::Result<u64> {
    let mut buf = vec![0u8; TAIL_SCAN_CHUNK as usize];
    let mut end = file_len;

    while end > 0 {
        let start = end.saturating_sub(TAIL_SCAN_CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;

        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }

    Ok(0)
}
