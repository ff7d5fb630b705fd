//! Blocking client
//!
//! Speaks the wire protocol over one TCP connection. Used by the CLI.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{KvError, Result};
use crate::protocol::{decode_entries, read_response, write_command, Command, Response, Status};

/// A connection to a LogKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for the raw response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Get a value; a missing key is `KvError::KeyNotFound`
    pub fn get(&mut self, key: &str) -> Result<String> {
        let response = self.request(&Command::Get { key: key.to_string() }, key)?;
        Ok(response.text())
    }

    pub fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let command = Command::Put {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.request(&command, key).map(|_| ())
    }

    /// Delete a key; a missing key is `KvError::KeyNotFound`
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.request(&Command::Delete { key: key.to_string() }, key)
            .map(|_| ())
    }

    /// Every live pair, sorted by key
    pub fn enumerate(&mut self) -> Result<Vec<(String, String)>> {
        let response = self.request(&Command::Enumerate, "")?;
        decode_entries(response.payload.as_deref().unwrap_or(&[]))
    }

    pub fn size(&mut self) -> Result<u64> {
        let response = self.request(&Command::Size, "")?;
        let payload = response.payload.unwrap_or_default();
        let bytes: [u8; 8] = payload
            .as_slice()
            .try_into()
            .map_err(|_| KvError::Protocol(format!("size: expected 8 bytes, got {}", payload.len())))?;
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn ping(&mut self) -> Result<()> {
        self.request(&Command::Ping, "").map(|_| ())
    }

    /// Send a command and turn non-OK statuses into errors
    fn request(&mut self, command: &Command, key: &str) -> Result<Response> {
        let response = self.send(command)?;
        match response.status {
            Status::Ok => Ok(response),
            Status::NotFound => Err(KvError::KeyNotFound(key.to_string())),
            Status::Error => Err(KvError::Protocol(response.text())),
            Status::Unavailable => Err(KvError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("server storage unavailable: {}", response.text()),
            ))),
        }
    }
}
