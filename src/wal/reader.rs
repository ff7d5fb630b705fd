//! Log Reader
//!
//! Lazily decodes log lines in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;

use crate::error::{KvError, Result};

use super::{DecodeError, Record};

/// One-shot iterator over the records of a log file
///
/// Yields `Err(KvError::MalformedRecord)` for a line that does not decode
/// and keeps going; an IO error ends the iteration.
pub struct LogReader {
    reader: BufReader<File>,

    /// 1-based number of the last line read
    line: u64,

    /// Reused line buffer
    buf: Vec<u8>,

    done: bool,
}

impl LogReader {
    /// Open a log file for reading from the start
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            line: 0,
            buf: Vec::new(),
            done: false,
        })
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    fn decode_current(&mut self) -> Result<Record> {
        let line = self.line;
        let malformed = move |source| KvError::MalformedRecord { line, source };

        let Some(body) = self.buf.strip_suffix(b"\n") else {
            // Only the last line of a file can lack its newline
            self.done = true;
            return Err(malformed(DecodeError::Unterminated));
        };

        let text = std::str::from_utf8(body).map_err(|_| malformed(DecodeError::InvalidUtf8))?;
        Record::decode(text).map_err(malformed)
    }
}

impl Iterator for LogReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line += 1;
                Some(self.decode_current())
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl FusedIterator for LogReader {}
