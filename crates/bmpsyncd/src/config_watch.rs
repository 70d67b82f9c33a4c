//! Configuration watchers and worker lifecycle.
//!
//! One worker task per watched table sits on a channel of [`ConfigEvent`]s
//! and propagates enable/disable transitions into the shared registry,
//! flushing the table on disable. A CONFIG_DB poller reads the `BMP|table`
//! entry on a select-style interval and dispatches only actual changes, so
//! duplicate notifications degrade to no-ops at the worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::bmp_sync::BmpSync;
use crate::error::{BmpSyncError, Result};
use crate::registry::TableRegistry;
use crate::state_db::StateStore;
use crate::tables;
use crate::types::{BmpTable, ConfigEvent};

/// Interval between CONFIG_DB polls (matches the C++ SELECT_TIMEOUT).
const SELECT_TIMEOUT_MS: u64 = 1000;

/// How often a parked worker wakes to re-check the shutdown flag.
const WORKER_POLL_MS: u64 = 100;

/// Per-table event channel depth.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Starts, feeds, and stops the per-table configuration watchers.
pub struct TableMonitor<S: StateStore + 'static> {
    registry: Arc<TableRegistry>,
    sync: Arc<BmpSync<S>>,
    shutdown: Arc<AtomicBool>,
    // Shared with the config poller so tables started later are visible
    // to it and stop() can close every channel.
    senders: Arc<RwLock<HashMap<BmpTable, mpsc::Sender<ConfigEvent>>>>,
    workers: Vec<(String, JoinHandle<()>)>,
}

impl<S: StateStore + 'static> TableMonitor<S> {
    /// Creates a monitor over the shared sync engine and registry.
    pub fn new(sync: Arc<BmpSync<S>>, registry: Arc<TableRegistry>) -> Self {
        Self {
            registry,
            sync,
            shutdown: Arc::new(AtomicBool::new(false)),
            senders: Arc::new(RwLock::new(HashMap::new())),
            workers: Vec::new(),
        }
    }

    /// Returns the cooperative shutdown flag shared with every worker.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of currently-spawned worker tasks.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Seeds the registry from the CONFIG_DB `BMP|table` entry.
    ///
    /// Missing fields default to enabled. No reset is performed here; the
    /// store starts empty at daemon startup.
    pub async fn load_initial_config<C: StateStore>(&self, config_db: &C) -> Result<()> {
        let fields = config_db.hget_all(tables::CFG_BMP_CONFIG_KEY).await?;
        for table in BmpTable::ALL {
            match parse_enable_flag(&fields, table) {
                Some(true) | None => {
                    self.registry.enable(table);
                }
                Some(false) => {
                    self.registry.disable(table);
                }
            }
        }
        info!(enabled = ?self.registry.enabled_tables(), "loaded initial BMP table config");
        Ok(())
    }

    /// Spawns one watcher task per requested table name.
    ///
    /// Fails fast with `ConfigError` before anything is spawned if a name
    /// is unrecognized. Names already being watched are skipped.
    pub fn start(&mut self, table_names: &[&str]) -> Result<()> {
        let mut requested = Vec::with_capacity(table_names.len());
        for name in table_names {
            requested.push(name.parse::<BmpTable>()?);
        }

        for table in requested {
            if self.senders.read().contains_key(&table) {
                continue;
            }
            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let handle = tokio::spawn(Self::run_worker(
                table,
                rx,
                Arc::clone(&self.registry),
                Arc::clone(&self.sync),
                Arc::clone(&self.shutdown),
            ));
            self.senders.write().insert(table, tx);
            self.workers.push((table.name().to_string(), handle));
        }
        Ok(())
    }

    /// Delivers a desired-state change to the table's watcher.
    ///
    /// Used by the CONFIG_DB poller and by external callers that learn of
    /// configuration changes out of band.
    pub async fn notify(&self, event: ConfigEvent) -> Result<()> {
        let sender = self
            .senders
            .read()
            .get(&event.table)
            .cloned()
            .ok_or_else(|| BmpSyncError::config(format!("table not watched: {}", event.table)))?;
        sender.send(event).await.map_err(|_| {
            BmpSyncError::config(format!("watcher for {} is gone", event.table))
        })
    }

    /// Spawns the poller that mirrors CONFIG_DB `BMP|table` changes into
    /// the per-table event channels.
    ///
    /// The poller reads the live sender map on every interval, so tables
    /// started after it spawns are picked up.
    pub fn spawn_config_poller<C: StateStore + 'static>(&mut self, config_db: Arc<C>) {
        let senders = Arc::clone(&self.senders);
        let shutdown = Arc::clone(&self.shutdown);
        let mut last_seen: HashMap<BmpTable, bool> = BmpTable::ALL
            .into_iter()
            .map(|t| (t, self.registry.is_enabled(t)))
            .collect();

        let handle = tokio::spawn(async move {
            debug!("config poller started");
            'poll: loop {
                sleep(Duration::from_millis(SELECT_TIMEOUT_MS)).await;
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }

                let fields = match config_db.hget_all(tables::CFG_BMP_CONFIG_KEY).await {
                    Ok(fields) => fields,
                    Err(e) => {
                        warn!(error = %e, "failed to read BMP config, will retry");
                        continue;
                    }
                };

                // Snapshot the current watchers; the lock is not held
                // across the sends.
                let targets: Vec<(BmpTable, mpsc::Sender<ConfigEvent>)> = senders
                    .read()
                    .iter()
                    .map(|(table, tx)| (*table, tx.clone()))
                    .collect();
                for (table, sender) in targets {
                    let desired = parse_enable_flag(&fields, table).unwrap_or(true);
                    if last_seen.get(&table) == Some(&desired) {
                        continue;
                    }
                    last_seen.insert(table, desired);
                    let event = ConfigEvent {
                        table,
                        enabled: desired,
                    };
                    if sender.send(event).await.is_err() {
                        // Watchers are gone; the monitor is stopping.
                        break 'poll;
                    }
                }
            }
            debug!("config poller stopped");
        });
        self.workers.push(("config-poller".to_string(), handle));
    }

    /// Raises the shutdown flag and joins every worker.
    ///
    /// Idempotent: a second call finds no workers and returns immediately.
    /// In-flight store operations are allowed to finish naturally.
    pub async fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Closing the channels wakes parked workers without waiting for
        // the poll interval.
        self.senders.write().clear();
        for (name, handle) in self.workers.drain(..) {
            if let Err(e) = handle.await {
                warn!(worker = %name, error = %e, "worker join failed");
            }
        }
    }

    /// Watcher loop for one table.
    async fn run_worker(
        table: BmpTable,
        mut events: mpsc::Receiver<ConfigEvent>,
        registry: Arc<TableRegistry>,
        sync: Arc<BmpSync<S>>,
        shutdown: Arc<AtomicBool>,
    ) {
        debug!(%table, "config watcher started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => Self::apply_event(event, &registry, &sync).await,
                    // All senders dropped: the monitor is stopping.
                    None => break,
                },
                _ = sleep(Duration::from_millis(WORKER_POLL_MS)) => {}
            }
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
        }
        debug!(%table, "config watcher stopped");
    }

    async fn apply_event(event: ConfigEvent, registry: &TableRegistry, sync: &BmpSync<S>) {
        if event.enabled {
            if registry.enable(event.table) {
                info!(table = %event.table, "table population enabled");
            }
        } else if registry.disable(event.table) {
            // The registry reflects "disabled" before the flush runs, so no
            // writer passing the gate after this point can repopulate a key
            // the flush is about to remove. A write already in flight may
            // still leave a stale key until the next reset.
            info!(table = %event.table, "table population disabled, flushing");
            if let Err(e) = sync.reset_table(event.table).await {
                warn!(
                    table = %event.table,
                    error = %e,
                    "flush after disable failed, stale entries remain until next reset"
                );
            }
        }
    }
}

/// Reads a table's enablement field out of the `BMP|table` hash. `None`
/// means the field is absent or unparseable.
fn parse_enable_flag(fields: &HashMap<String, String>, table: BmpTable) -> Option<bool> {
    match fields.get(table.config_field()).map(String::as_str) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            warn!(table = %table, value = other, "ignoring unparseable enable flag");
            None
        }
        None => None,
    }
}
