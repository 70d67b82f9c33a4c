//! bmpsyncd daemon entry point.
//!
//! Initializes logging and database connections, seeds the enablement
//! registry from CONFIG_DB, starts the per-table configuration watchers,
//! and runs until SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sonic_bmpsyncd::{
    BmpSync, RedisConfig, StateDb, TableMonitor, TableRegistry, BGP_NEIGHBOR_TABLE,
    BGP_RIB_IN_TABLE, BGP_RIB_OUT_TABLE,
};

/// Default Redis connection settings.
const REDIS_HOST: &str = "127.0.0.1";
const REDIS_PORT: u16 = 6379;

/// Shutdown poll interval for the main loop.
const SHUTDOWN_POLL_MS: u64 = 100;

/// Initialize tracing/logging.
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Resolves the Redis endpoint, allowing env overrides for test setups.
fn redis_endpoint() -> (String, u16) {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| REDIS_HOST.to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(REDIS_PORT);
    (host, port)
}

/// Setup signal handlers for graceful shutdown.
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("bmpsyncd: Received SIGINT/SIGTERM");
            shutdown.store(true, Ordering::Relaxed);
        }
    });
}

async fn run_daemon() -> anyhow::Result<()> {
    let (host, port) = redis_endpoint();

    let state_db = Arc::new(StateDb::new(RedisConfig::state_db(host.as_str(), port)));
    let config_db = Arc::new(StateDb::new(RedisConfig::config_db(host.as_str(), port)));

    let registry = Arc::new(TableRegistry::new());
    let sync = Arc::new(BmpSync::new(Arc::clone(&state_db), Arc::clone(&registry)));

    let mut monitor = TableMonitor::new(Arc::clone(&sync), Arc::clone(&registry));
    if let Err(e) = monitor.load_initial_config(config_db.as_ref()).await {
        warn!(error = %e, "initial BMP config read failed, keeping table defaults");
    }

    monitor
        .start(&[BGP_NEIGHBOR_TABLE, BGP_RIB_IN_TABLE, BGP_RIB_OUT_TABLE])
        .context("starting table watchers")?;
    monitor.spawn_config_poller(Arc::clone(&config_db));
    info!("bmpsyncd: Watching {} tables", monitor.worker_count() - 1);

    let shutdown = monitor.shutdown_flag();
    setup_signal_handlers(Arc::clone(&shutdown));

    while !shutdown.load(Ordering::Relaxed) {
        tokio::time::sleep(tokio::time::Duration::from_millis(SHUTDOWN_POLL_MS)).await;
    }

    monitor.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting bmpsyncd (Rust) ---");

    match run_daemon().await {
        Ok(()) => {
            info!("bmpsyncd: Graceful shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "bmpsyncd exiting with error");
            ExitCode::FAILURE
        }
    }
}
