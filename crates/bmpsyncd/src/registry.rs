//! Per-table enablement registry.
//!
//! A shared set of currently-enabled tables, consulted by the write path
//! before every store operation and mutated by the configuration watchers.
//! Absence from the set means writes to that table are silently dropped -
//! enablement gates at write time, not at event-production time.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::types::BmpTable;

/// Single source of truth for per-table enablement.
///
/// Readers never observe a partially-applied enable/disable: all mutation
/// happens under one write lock with minimal critical sections. The
/// registry has no persistence; it is rebuilt from CONFIG_DB on process
/// start and updated from subsequent change notifications.
#[derive(Debug)]
pub struct TableRegistry {
    enabled: RwLock<HashSet<BmpTable>>,
}

impl TableRegistry {
    /// Creates a registry with every table enabled, matching the defaults
    /// the daemon had before per-table configuration existed.
    pub fn new() -> Self {
        Self {
            enabled: RwLock::new(BmpTable::ALL.into_iter().collect()),
        }
    }

    /// Marks a table enabled.
    ///
    /// Returns `true` if the table was previously disabled. Enabling never
    /// triggers a reset; population simply resumes going forward.
    pub fn enable(&self, table: BmpTable) -> bool {
        self.enabled.write().insert(table)
    }

    /// Marks a table disabled.
    ///
    /// Returns `true` if a change occurred.
    pub fn disable(&self, table: BmpTable) -> bool {
        self.enabled.write().remove(&table)
    }

    /// Point-in-time membership check.
    pub fn is_enabled(&self, table: BmpTable) -> bool {
        self.enabled.read().contains(&table)
    }

    /// Snapshot of the currently-enabled tables.
    pub fn enabled_tables(&self) -> Vec<BmpTable> {
        self.enabled.read().iter().copied().collect()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
