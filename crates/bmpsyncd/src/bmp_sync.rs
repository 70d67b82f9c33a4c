//! Enablement-gated writes and table resets against STATE_DB.
//!
//! `BmpSync` is the write/control surface consumed by the BMP message
//! decoding layer: it checks enablement, builds composite keys, and issues
//! store operations. It performs no buffering and no internal retries;
//! callers decide whether to drop or retry on failure.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::registry::TableRegistry;
use crate::state_db::StateStore;
use crate::tables;
use crate::types::{BmpTable, WriteOutcome};

/// Writer and reset engine for the BMP state tables.
pub struct BmpSync<S: StateStore> {
    store: Arc<S>,
    registry: Arc<TableRegistry>,
}

impl<S: StateStore> BmpSync<S> {
    /// Creates a new sync engine over an explicit store connection and
    /// registry (no hidden globals; both are shared with the caller).
    pub fn new(store: Arc<S>, registry: Arc<TableRegistry>) -> Self {
        Self { store, registry }
    }

    /// Returns the shared enablement registry.
    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    /// Upserts field-value pairs under an already-built composite key.
    ///
    /// If the table is disabled the write is dropped (not buffered) and
    /// `Ok(WriteOutcome::Disabled)` is returned without any store traffic.
    pub async fn write(
        &self,
        table: BmpTable,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<WriteOutcome> {
        if !self.registry.is_enabled(table) {
            debug!(%table, key, "table disabled, dropping write");
            return Ok(WriteOutcome::Disabled);
        }
        self.store.hset_fields(key, fields).await?;
        Ok(WriteOutcome::Written)
    }

    /// Writes a neighbor session record keyed by neighbor address.
    pub async fn write_neighbor(
        &self,
        neighbor: &str,
        fields: &[(String, String)],
    ) -> Result<WriteOutcome> {
        let key = tables::neighbor_key(BmpTable::Neighbor.name(), neighbor);
        self.write(BmpTable::Neighbor, &key, fields).await
    }

    /// Writes a received-route record keyed by NLRI and neighbor address.
    pub async fn write_rib_in(
        &self,
        nlri: &str,
        neighbor: &str,
        fields: &[(String, String)],
    ) -> Result<WriteOutcome> {
        let key = tables::rib_key(BmpTable::RibIn.name(), nlri, neighbor);
        self.write(BmpTable::RibIn, &key, fields).await
    }

    /// Writes an advertised-route record keyed by NLRI and neighbor address.
    pub async fn write_rib_out(
        &self,
        nlri: &str,
        neighbor: &str,
        fields: &[(String, String)],
    ) -> Result<WriteOutcome> {
        let key = tables::rib_key(BmpTable::RibOut.name(), nlri, neighbor);
        self.write(BmpTable::RibOut, &key, fields).await
    }

    /// Deletes the given keys.
    ///
    /// A failure on one key does not block attempting the rest; the first
    /// error is returned once every key has been tried.
    pub async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut first_err = None;
        for key in keys {
            if let Err(e) = self.store.del_key(key).await {
                warn!(key, error = %e, "delete failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flushes every key under the table's prefix.
    ///
    /// An already-empty table succeeds trivially. The flush is not atomic
    /// across keys: a mid-delete failure leaves partial progress, which is
    /// acceptable since the goal is eventual emptiness.
    #[instrument(skip(self))]
    pub async fn reset_table(&self, table: BmpTable) -> Result<()> {
        let pattern = tables::table_pattern(table.name());
        let keys = self.store.keys(&pattern).await?;
        if keys.is_empty() {
            debug!(%table, "table already empty");
            return Ok(());
        }
        info!(%table, count = keys.len(), "flushing table");
        for key in &keys {
            self.store.del_key(key).await?;
        }
        Ok(())
    }

    /// Resets every statically-known table regardless of enablement.
    ///
    /// Used when the upstream BMP feed reconnects, to clear stale state
    /// without disabling population. Continues past per-table failures and
    /// reports the first error so one bad table cannot leave the others
    /// stale.
    pub async fn reset_all(&self) -> Result<()> {
        let mut first_err = None;
        for table in BmpTable::ALL {
            if let Err(e) = self.reset_table(table).await {
                warn!(%table, error = %e, "reset failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
