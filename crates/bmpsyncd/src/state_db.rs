//! Redis connection handling for bmpsyncd.
//!
//! One [`StateDb`] owns a single lazily-established session to a SONiC
//! database. The session handle is a multiplexed `ConnectionManager`, so
//! concurrent writer and reset callers share it without further locking;
//! only the lazy initialization is serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{BmpSyncError, Result};

/// Redis database selector (SONiC database map, restricted to the
/// databases this daemon touches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedisDb {
    /// CONFIG_DB (database 4) - switch configuration
    ConfigDb = 4,
    /// STATE_DB (database 6) - operational state
    StateDb = 6,
}

/// Configuration for a Redis connection.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Database selector
    pub db: RedisDb,
}

impl RedisConfig {
    /// Creates a new Redis configuration.
    pub fn new(host: impl Into<String>, port: u16, db: RedisDb) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    /// Creates a CONFIG_DB connection config.
    pub fn config_db(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, RedisDb::ConfigDb)
    }

    /// Creates a STATE_DB connection config.
    pub fn state_db(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, RedisDb::StateDb)
    }

    /// Returns the Redis connection URI.
    fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db as u8)
    }
}

/// Store primitives used by the write and reset paths.
///
/// `StateDb` implements this against Redis; tests substitute in-memory
/// doubles. Operations are synchronous from the caller's point of view and
/// never retry internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Upserts field-value pairs under `key`.
    async fn hset_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// Removes all fields under `key`.
    async fn del_key(&self, key: &str) -> Result<()>;

    /// Returns the keys currently matching `pattern`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Reads all field-value pairs of a hash entry (used for the
    /// CONFIG_DB `BMP|table` entry).
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;
}

/// A lazily-connected session to one SONiC Redis database.
pub struct StateDb {
    config: RedisConfig,
    conn: Mutex<Option<ConnectionManager>>,
}

impl StateDb {
    /// Creates an unconnected handle; the session is established by the
    /// first operation that needs it.
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Establishes the session if needed and returns a handle to it.
    /// Idempotent: an already-connected session is reused.
    pub async fn connect(&self) -> Result<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let uri = self.config.uri();
        let client = redis::Client::open(uri.clone())
            .map_err(|e| BmpSyncError::connection(format!("{uri}: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| BmpSyncError::connection(format!("failed to connect to {uri}: {e}")))?;

        info!(
            host = %self.config.host,
            db = self.config.db as u8,
            "Connected to Redis"
        );
        *guard = Some(conn.clone());
        Ok(conn)
    }

}

/// Classifies a command-phase failure: a lost or refused session surfaces
/// as `ConnectionError`, a rejected operation as `CommandError`.
fn map_command_error(op: &str, key: &str, err: redis::RedisError) -> BmpSyncError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        BmpSyncError::connection(format!("{op} {key}: {err}"))
    } else {
        BmpSyncError::command(format!("{op} {key} failed: {err}"))
    }
}

#[async_trait]
impl StateStore for StateDb {
    async fn hset_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connect().await?;
        debug!(key, count = fields.len(), "HSET");
        let _: () = conn
            .hset_multiple(key, fields)
            .await
            .map_err(|e| map_command_error("HSET", key, e))?;
        Ok(())
    }

    async fn del_key(&self, key: &str) -> Result<()> {
        let mut conn = self.connect().await?;
        debug!(key, "DEL");
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| map_command_error("DEL", key, e))?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connect().await?;
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| map_command_error("KEYS", pattern, e))?;
        debug!(pattern, count = keys.len(), "KEYS");
        Ok(keys)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connect().await?;
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| map_command_error("HGETALL", key, e))?;
        Ok(fields)
    }
}
