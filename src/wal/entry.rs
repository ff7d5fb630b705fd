//! Log record codec
//!
//! Encodes and decodes the single-line records of the operation log.
//!
//! ## Line Format
//! ```text
//! PUT,<key>,<value>\n
//! DEL,<key>\n
//! ```
//!
//! Inside a field `\`, `,`, LF and CR are escaped as `\\`, `\,`, `\n` and
//! `\r`, so any key or value survives a round trip through the log. Fields
//! that contain none of those characters are written verbatim.

use thiserror::Error;

/// Opcode of a put record
pub const PUT_OPCODE: &str = "PUT";

/// Opcode of a delete record
pub const DELETE_OPCODE: &str = "DEL";

/// Field separator
const SEPARATOR: char = ',';

/// Escape character
const ESCAPE: char = '\\';

/// One logged operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Put a key-value pair
    Put { key: String, value: String },

    /// Delete a key (tombstone)
    Delete { key: String },
}

/// Why a line could not be decoded into a [`Record`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected at least 2 fields, found {0}")]
    TooFewFields(usize),

    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("{opcode} takes {expected} fields, found {found}")]
    FieldCount {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("line is missing its terminating newline")]
    Unterminated,
}

impl Record {
    /// Build a put record
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Record::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a delete record
    pub fn delete(key: impl Into<String>) -> Self {
        Record::Delete { key: key.into() }
    }

    /// The key this record touches
    pub fn key(&self) -> &str {
        match self {
            Record::Put { key, .. } | Record::Delete { key } => key,
        }
    }

    /// Encode as one newline-terminated log line
    pub fn encode(&self) -> String {
        let mut line = String::new();
        match self {
            Record::Put { key, value } => {
                line.push_str(PUT_OPCODE);
                line.push(SEPARATOR);
                escape_into(&mut line, key);
                line.push(SEPARATOR);
                escape_into(&mut line, value);
            }
            Record::Delete { key } => {
                line.push_str(DELETE_OPCODE);
                line.push(SEPARATOR);
                escape_into(&mut line, key);
            }
        }
        line.push('\n');
        line
    }

    /// Decode one log line, without its terminating newline.
    ///
    /// A trailing CR is tolerated so logs edited on Windows still replay.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut fields = split_fields(line)?;

        if fields.len() < 2 {
            return Err(DecodeError::TooFewFields(fields.len()));
        }

        match fields[0].as_str() {
            PUT_OPCODE => {
                if fields.len() != 3 {
                    return Err(DecodeError::FieldCount {
                        opcode: PUT_OPCODE,
                        expected: 3,
                        found: fields.len(),
                    });
                }
                let value = fields.pop().unwrap_or_default();
                let key = fields.pop().unwrap_or_default();
                Ok(Record::Put { key, value })
            }
            DELETE_OPCODE => {
                if fields.len() != 2 {
                    return Err(DecodeError::FieldCount {
                        opcode: DELETE_OPCODE,
                        expected: 2,
                        found: fields.len(),
                    });
                }
                let key = fields.pop().unwrap_or_default();
                Ok(Record::Delete { key })
            }
            other => Err(DecodeError::UnknownOpcode(other.to_string())),
        }
    }
}

fn escape_into(out: &mut String, field: &str) {
    for c in field.chars() {
        match c {
            ESCAPE => out.push_str("\\\\"),
            SEPARATOR => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// Split on unescaped separators, unescaping each field
fn split_fields(line: &str) -> Result<Vec<String>, DecodeError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some((_, ESCAPE)) => current.push(ESCAPE),
                Some((_, SEPARATOR)) => current.push(SEPARATOR),
                Some((_, 'n')) => current.push('\n'),
                Some((_, 'r')) => current.push('\r'),
                _ => return Err(DecodeError::InvalidEscape(pos)),
            },
            SEPARATOR => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);

    Ok(fields)
}
