//! Shared types for bmpsyncd.

use std::fmt;
use std::str::FromStr;

use crate::error::BmpSyncError;
use crate::tables;

/// The statically-known BMP state tables.
///
/// Tables are defined at startup and never deleted, only emptied (reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BmpTable {
    /// BGP neighbor session state.
    Neighbor,
    /// Routes received from neighbors (Adj-RIB-In).
    RibIn,
    /// Routes advertised to neighbors (Adj-RIB-Out).
    RibOut,
}

impl BmpTable {
    /// Every watched table, in reset order.
    pub const ALL: [BmpTable; 3] = [BmpTable::Neighbor, BmpTable::RibIn, BmpTable::RibOut];

    /// Returns the STATE_DB table name, which is also the key prefix.
    pub fn name(&self) -> &'static str {
        match self {
            BmpTable::Neighbor => tables::BGP_NEIGHBOR_TABLE,
            BmpTable::RibIn => tables::BGP_RIB_IN_TABLE,
            BmpTable::RibOut => tables::BGP_RIB_OUT_TABLE,
        }
    }

    /// Returns the enablement field name in the CONFIG_DB `BMP|table` entry.
    pub fn config_field(&self) -> &'static str {
        match self {
            BmpTable::Neighbor => tables::fields::BGP_NEIGHBOR_TABLE,
            BmpTable::RibIn => tables::fields::BGP_RIB_IN_TABLE,
            BmpTable::RibOut => tables::fields::BGP_RIB_OUT_TABLE,
        }
    }
}

impl fmt::Display for BmpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BmpTable {
    type Err = BmpSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            tables::BGP_NEIGHBOR_TABLE => Ok(BmpTable::Neighbor),
            tables::BGP_RIB_IN_TABLE => Ok(BmpTable::RibIn),
            tables::BGP_RIB_OUT_TABLE => Ok(BmpTable::RibOut),
            other => Err(BmpSyncError::config(format!("unknown BMP table: {other}"))),
        }
    }
}

/// Field-value pairs stored under a composite key.
pub type FieldValues = Vec<(String, String)>;

/// Outcome of a write against an enablement-gated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was upserted.
    Written,
    /// The table is disabled; the write was deliberately dropped.
    Disabled,
}

/// A desired-state change for one table, delivered by the configuration
/// watcher. Duplicate events for the current state are tolerated as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigEvent {
    /// The table the change applies to.
    pub table: BmpTable,
    /// Desired enablement state.
    pub enabled: bool,
}
