//! # bmpsyncd - BMP State Synchronization Daemon
//!
//! This crate implements the BMP (BGP Monitoring Protocol) state
//! synchronization daemon for SONiC. It mirrors BGP telemetry produced by
//! the BMP collector - neighbor session state, received (RIB-IN) and
//! advertised (RIB-OUT) routes - into STATE_DB so that CLI tools and
//! management daemons can observe live BGP state without coupling to the
//! collector's internal data model.
//!
//! ## Responsibilities
//! - Composite key construction for the three BMP state tables
//! - Enablement-gated writes and deletes against STATE_DB
//! - Per-table flush (reset) on disable and on upstream reconnect
//! - One configuration watcher per table, driven by the CONFIG_DB `BMP`
//!   table, with cooperative shutdown
//!
//! ## Configuration Sources
//! - `BMP` table (CONFIG_DB): per-table enable/disable flags
//!
//! ## State Destinations
//! - `BGP_NEIGHBOR_TABLE`, `BGP_RIB_IN_TABLE`, `BGP_RIB_OUT_TABLE`
//!   (STATE_DB)

mod bmp_sync;
mod config_watch;
mod error;
mod registry;
mod state_db;
mod tables;
mod types;

pub use bmp_sync::BmpSync;
pub use config_watch::TableMonitor;
pub use error::{BmpSyncError, Result};
pub use registry::TableRegistry;
pub use state_db::{RedisConfig, RedisDb, StateDb, StateStore};
pub use tables::*;
pub use types::*;
