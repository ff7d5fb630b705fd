//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{Engine, Outcome};
use crate::error::{KvError, Result};
use crate::protocol::{
    encode_entries, read_command, write_response, Command, Response, MAX_PAYLOAD_SIZE,
};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a timeout disabled)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects, idles past the read timeout,
    /// or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(KvError::Io(ref e)) if is_hangup(e) => {
                    tracing::debug!("Client {} disconnected ({})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let response = self.execute_command(command);

            if let Err(e) = self.send_response(response) {
                if let KvError::Io(ref io_err) = e {
                    if is_hangup(io_err) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command and map the result onto a response
    ///
    /// A missing key is NOT_FOUND; a closed or failing log is UNAVAILABLE.
    /// A reply too large to frame becomes an ERROR.
    fn execute_command(&self, command: Command) -> Response {
        let response = self.outcome_response(command);

        let size = response.payload.as_ref().map_or(0, Vec::len);
        if size > MAX_PAYLOAD_SIZE as usize {
            tracing::warn!(
                "Response of {} bytes for {} exceeds the frame limit",
                size,
                self.peer_addr
            );
            return Response::error("response exceeds maximum payload size");
        }
        response
    }

    fn outcome_response(&self, command: Command) -> Response {
        match self.engine.execute(command) {
            Ok(Outcome::Value(value)) => Response::ok(Some(value.into_bytes())),
            Ok(Outcome::Entries(entries)) => Response::ok(Some(encode_entries(&entries))),
            Ok(Outcome::Count(count)) => Response::ok(Some((count as u64).to_be_bytes().to_vec())),
            Ok(Outcome::Done) => Response::ok(None),
            Ok(Outcome::Pong) => Response::ok(Some(b"PONG".to_vec())),
            Err(KvError::KeyNotFound(_)) => Response::not_found(),
            Err(e @ (KvError::Closed | KvError::Io(_))) => {
                tracing::error!("Storage unavailable for {}: {}", self.peer_addr, e);
                Response::unavailable(&e.to_string())
            }
            Err(e) => Response::error(&e.to_string()),
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }
}

/// Disconnects and idle timeouts end a connection quietly
fn is_hangup(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            // Read timeout (Windows uses TimedOut instead of WouldBlock)
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
