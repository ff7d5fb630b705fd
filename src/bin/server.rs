//! LogKV Server Binary
//!
//! Opens the engine and serves it over TCP.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use logkv::network::Server;
use logkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// LogKV Server
#[derive(Parser, Debug)]
#[command(name = "logkv-server")]
#[command(about = "Key-value store backed by an append-only log")]
#[command(version)]
struct Args {
    /// Log file path
    #[arg(long, default_value = "storage.log")]
    log: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9686")]
    listen: String,

    /// Maximum connections queued or being served
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// fsync every N appends instead of every append
    #[arg(long)]
    sync_every: Option<usize>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LogKV Server v{}", logkv::VERSION);
    tracing::info!("Log file: {}", args.log);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = match args.sync_every {
        Some(count) => SyncStrategy::EveryNEntries { count },
        None => SyncStrategy::EveryWrite,
    };

    let config = Config::builder()
        .log_path(&args.log)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .sync_strategy(sync_strategy)
        .build();

    // A log that cannot be opened must keep the process from serving
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine ready: {} keys, {} records replayed, {} skipped",
        engine.size().unwrap_or(0),
        engine.recovery().entries_recovered,
        engine.recovery().entries_corrupted
    );

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C stops the accept loop so the log is synced and closed below
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }
}
