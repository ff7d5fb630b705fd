//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::io::{self, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for LogKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// The listener is non-blocking so the accept loop can observe shutdown.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops [`Server::run`] when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Serve until shutdown is signalled (blocking)
    ///
    /// Connections in flight are finished before this returns.
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.max_connections);

        let workers: Vec<_> = (0..self.config.worker_threads)
            .map(|id| {
                let receiver = receiver.clone();
                let engine = Arc::clone(&self.engine);
                let config = self.config.clone();
                thread::Builder::new()
                    .name(format!("logkv-worker-{}", id))
                    .spawn(move || worker_loop(receiver, engine, config))
            })
            .collect::<io::Result<_>>()?;
        drop(receiver);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    match sender.try_send(stream) {
                        Ok(()) => tracing::trace!("Queued connection from {}", addr),
                        Err(TrySendError::Full(stream)) => {
                            tracing::warn!("Connection limit reached, refusing {}", addr);
                            refuse(stream);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            tracing::error!("All workers exited, stopping server");
                            break;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        // Closing the channel lets workers drain the queue and exit
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

fn worker_loop(receiver: Receiver<TcpStream>, engine: Arc<Engine>, config: Config) {
    for stream in receiver.iter() {
        let result = Connection::new(stream, Arc::clone(&engine)).and_then(|mut conn| {
            conn.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
            conn.handle()
        });

        if let Err(e) = result {
            tracing::debug!("Connection ended with error: {}", e);
        }
    }
}

fn refuse(stream: TcpStream) {
    let mut writer = BufWriter::new(stream);
    let _ = write_response(&mut writer, &Response::error("server busy"));
}
