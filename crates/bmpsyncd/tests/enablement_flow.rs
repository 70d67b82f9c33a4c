//! End-to-end enablement and flush flows against an in-memory store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, timeout};

use sonic_bmpsyncd::{
    BmpSync, BmpTable, ConfigEvent, Result, StateStore, TableMonitor, TableRegistry, WriteOutcome,
    CFG_BMP_CONFIG_KEY,
};

/// In-memory stand-in for STATE_DB: key -> field -> value.
#[derive(Default)]
struct MemoryStore {
    data: Mutex<BTreeMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    fn record(&self, key: &str) -> Option<HashMap<String, String>> {
        self.data.lock().get(key).cloned()
    }

    fn key_count(&self) -> usize {
        self.data.lock().len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn hset_fields(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut data = self.data.lock();
        let record = data.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn del_key(&self, key: &str) -> Result<()> {
        self.data.lock().remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.data.lock().get(key).cloned().unwrap_or_default())
    }
}

fn make_sync() -> (Arc<MemoryStore>, Arc<TableRegistry>, Arc<BmpSync<MemoryStore>>) {
    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(TableRegistry::new());
    let sync = Arc::new(BmpSync::new(Arc::clone(&store), Arc::clone(&registry)));
    (store, registry, sync)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(f, v)| (f.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn neighbor_write_lands_under_composite_key() {
    let (store, _registry, sync) = make_sync();

    let outcome = sync
        .write_neighbor("10.0.0.1", &fields(&[("state", "established")]))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Written);

    let record = store.record("BGP_NEIGHBOR_TABLE:10.0.0.1").unwrap();
    assert_eq!(record.get("state").map(String::as_str), Some("established"));
}

#[tokio::test]
async fn repeated_write_is_idempotent() {
    let (store, _registry, sync) = make_sync();
    let fvs = fields(&[("state", "established"), ("asn", "65001")]);

    sync.write_neighbor("10.0.0.1", &fvs).await.unwrap();
    let first = store.record("BGP_NEIGHBOR_TABLE:10.0.0.1").unwrap();

    sync.write_neighbor("10.0.0.1", &fvs).await.unwrap();
    let second = store.record("BGP_NEIGHBOR_TABLE:10.0.0.1").unwrap();

    assert_eq!(first, second);
    assert_eq!(store.key_count(), 1);
}

#[tokio::test]
async fn disabled_table_drops_writes() {
    let (store, registry, sync) = make_sync();
    registry.disable(BmpTable::RibIn);

    let outcome = sync
        .write_rib_in("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Disabled);
    assert_eq!(store.key_count(), 0);
}

#[tokio::test]
async fn disable_notification_flushes_only_that_table() {
    let (store, registry, sync) = make_sync();

    sync.write_neighbor("10.0.0.1", &fields(&[("state", "established")]))
        .await
        .unwrap();
    sync.write_rib_in("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    sync.write_rib_in("10.1.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    assert_eq!(store.key_count(), 3);

    let mut monitor = TableMonitor::new(Arc::clone(&sync), Arc::clone(&registry));
    monitor
        .start(&["BGP_NEIGHBOR_TABLE", "BGP_RIB_IN_TABLE", "BGP_RIB_OUT_TABLE"])
        .unwrap();

    monitor
        .notify(ConfigEvent {
            table: BmpTable::RibIn,
            enabled: false,
        })
        .await
        .unwrap();

    {
        let registry = Arc::clone(&registry);
        wait_until(move || !registry.is_enabled(BmpTable::RibIn)).await;
    }
    {
        let store = Arc::clone(&store);
        wait_until(move || {
            store
                .data
                .lock()
                .keys()
                .all(|k| !k.starts_with("BGP_RIB_IN_TABLE"))
        })
        .await;
    }

    // The neighbor record survives; the disabled table stays empty.
    assert!(store.record("BGP_NEIGHBOR_TABLE:10.0.0.1").is_some());
    let outcome = sync
        .write_rib_in("10.2.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Disabled);

    monitor.stop().await;
}

#[tokio::test]
async fn enable_notification_never_resets_existing_records() {
    let (store, registry, sync) = make_sync();

    sync.write_neighbor("10.0.0.1", &fields(&[("state", "established")]))
        .await
        .unwrap();
    sync.write_rib_out("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();

    registry.disable(BmpTable::RibIn);
    let mut monitor = TableMonitor::new(Arc::clone(&sync), Arc::clone(&registry));
    monitor.start(&["BGP_RIB_IN_TABLE"]).unwrap();

    monitor
        .notify(ConfigEvent {
            table: BmpTable::RibIn,
            enabled: true,
        })
        .await
        .unwrap();
    {
        let registry = Arc::clone(&registry);
        wait_until(move || registry.is_enabled(BmpTable::RibIn)).await;
    }

    // Pre-existing records for other tables are untouched.
    assert!(store.record("BGP_NEIGHBOR_TABLE:10.0.0.1").is_some());
    assert!(store
        .record("BGP_RIB_OUT_TABLE:10.0.0.0/24:BGP_NEIGHBOR:10.0.0.1")
        .is_some());

    // Population resumes going forward.
    let outcome = sync
        .write_rib_in("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Written);

    monitor.stop().await;
}

#[tokio::test]
async fn reset_all_clears_every_table_regardless_of_enablement() {
    let (store, registry, sync) = make_sync();

    sync.write_neighbor("10.0.0.1", &fields(&[("state", "established")]))
        .await
        .unwrap();
    sync.write_rib_in("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();
    sync.write_rib_out("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();

    // reset_all is the upstream-reconnect path: it flushes disabled tables
    // too, without changing enablement.
    registry.disable(BmpTable::RibOut);
    sync.reset_all().await.unwrap();

    assert_eq!(store.key_count(), 0);
    assert!(registry.is_enabled(BmpTable::Neighbor));
    assert!(!registry.is_enabled(BmpTable::RibOut));
}

#[tokio::test]
async fn remove_deletes_given_keys() {
    let (store, _registry, sync) = make_sync();

    sync.write_neighbor("10.0.0.1", &fields(&[("state", "established")]))
        .await
        .unwrap();
    sync.write_neighbor("10.0.0.2", &fields(&[("state", "idle")]))
        .await
        .unwrap();

    sync.remove(&[
        "BGP_NEIGHBOR_TABLE:10.0.0.1".to_string(),
        "BGP_NEIGHBOR_TABLE:10.0.0.2".to_string(),
    ])
    .await
    .unwrap();
    assert_eq!(store.key_count(), 0);
}

#[tokio::test]
async fn initial_config_load_seeds_registry() {
    let (_store, registry, sync) = make_sync();

    let config_db = MemoryStore::default();
    config_db
        .hset_fields(
            CFG_BMP_CONFIG_KEY,
            &fields(&[("bgp_neighbor_table", "false"), ("bgp_rib_out_table", "true")]),
        )
        .await
        .unwrap();

    // Stale pre-load state: the missing bgp_rib_in_table field must win it
    // back to the enabled default.
    registry.disable(BmpTable::RibIn);

    let monitor = TableMonitor::new(Arc::clone(&sync), Arc::clone(&registry));
    monitor.load_initial_config(&config_db).await.unwrap();

    assert!(!registry.is_enabled(BmpTable::Neighbor));
    assert!(registry.is_enabled(BmpTable::RibIn));
    assert!(registry.is_enabled(BmpTable::RibOut));
}

#[tokio::test]
async fn rib_records_land_under_scenario_keys() {
    let (store, _registry, sync) = make_sync();

    sync.write_rib_in("10.0.0.0/24", "10.0.0.1", &fields(&[("origin", "igp")]))
        .await
        .unwrap();

    assert!(store
        .record("BGP_RIB_IN_TABLE:10.0.0.0/24:BGP_NEIGHBOR:10.0.0.1")
        .is_some());
}
