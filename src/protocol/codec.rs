//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Requests and responses share one frame layout: a one-byte tag (command
//! type or status), a big-endian `u32` payload length, then the payload.
//!
//! ### Payload by Command Type
//! - GET:    key_len (4 bytes) + key
//! - PUT:    key_len (4 bytes) + key + value
//! - DELETE: key_len (4 bytes) + key
//! - PING, ENUMERATE, SIZE: empty
//!
//! ### Response Payloads
//! - GET:       value
//! - ENUMERATE: count (4) + [key_len (4) + key + value_len (4) + value]*
//! - SIZE:      count as u64 (8)
//! - errors:    message text

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{KvError, Result};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();

    match command {
        Command::Get { key } | Command::Delete { key } => put_field(&mut payload, key.as_bytes()),
        Command::Put { key, value } => {
            put_field(&mut payload, key.as_bytes());
            payload.put_slice(value.as_bytes());
        }
        Command::Enumerate | Command::Size | Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, payload) = split_frame(bytes)?;

    let command_type = CommandType::try_from(tag)
        .map_err(|b| KvError::Protocol(format!("Unknown command type: 0x{:02x}", b)))?;

    let mut buf = payload;
    let command = match command_type {
        CommandType::Get => Command::Get {
            key: take_field(&mut buf, "GET key")?,
        },
        CommandType::Delete => Command::Delete {
            key: take_field(&mut buf, "DELETE key")?,
        },
        CommandType::Put => {
            let key = take_field(&mut buf, "PUT key")?;
            let value = take_rest(&mut buf, "PUT value")?;
            Command::Put { key, value }
        }
        CommandType::Enumerate => Command::Enumerate,
        CommandType::Size => Command::Size,
        CommandType::Ping => Command::Ping,
    };

    if buf.has_remaining() {
        return Err(KvError::Protocol(format!(
            "{:?} command: {} unexpected trailing bytes",
            command_type,
            buf.remaining()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    frame(response.status as u8, response.payload.as_deref().unwrap_or(&[]))
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = split_frame(bytes)?;

    let status = Status::try_from(tag)
        .map_err(|b| KvError::Protocol(format!("Unknown response status: 0x{:02x}", b)))?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

/// Encode an ENUMERATE payload
pub fn encode_entries(entries: &[(String, String)]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32(entries.len() as u32);
    for (key, value) in entries {
        put_field(&mut buf, key.as_bytes());
        put_field(&mut buf, value.as_bytes());
    }
    buf.to_vec()
}

/// Decode an ENUMERATE payload
pub fn decode_entries(payload: &[u8]) -> Result<Vec<(String, String)>> {
    let mut buf = payload;
    if buf.remaining() < 4 {
        return Err(KvError::Protocol("entries: missing count".to_string()));
    }

    let count = buf.get_u32() as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let key = take_field(&mut buf, "entry key")?;
        let value = take_field(&mut buf, "entry value")?;
        entries.push((key, value));
    }

    if buf.has_remaining() {
        return Err(KvError::Protocol(format!(
            "entries: {} unexpected trailing bytes",
            buf.remaining()
        )));
    }

    Ok(entries)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

fn payload_len(header: &[u8]) -> Result<usize> {
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(payload_len as usize)
}

/// Split a buffer holding exactly one frame into tag and payload
fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let total_len = HEADER_SIZE + payload_len(bytes)?;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(&header)?;
    let mut message = vec![0u8; HEADER_SIZE + len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;

    Ok(message)
}

fn put_field(buf: &mut BytesMut, field: &[u8]) {
    buf.put_u32(field.len() as u32);
    buf.put_slice(field);
}

/// Read a length-prefixed UTF-8 field
fn take_field(buf: &mut &[u8], what: &str) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(KvError::Protocol(format!("{}: missing length", what)));
    }

    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(KvError::Protocol(format!(
            "{}: incomplete (expected {}, got {})",
            what,
            len,
            buf.remaining()
        )));
    }

    let (field, rest) = buf.split_at(len);
    *buf = rest;
    utf8(field, what)
}

/// Consume the rest of the buffer as UTF-8
fn take_rest(buf: &mut &[u8], what: &str) -> Result<String> {
    let field = *buf;
    *buf = &[];
    utf8(field, what)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| KvError::Protocol(format!("{}: not valid UTF-8", what)))
}
