//! C3 Connection Manager: a process-wide registry that owns typed database
//! handles, enforces lazy vs. eager lifecycle, performs health-check
//! sampling, and serves concurrent lookups (spec §4.3).
//!
//! Grounded in `modkit_db::DbManager`'s `DashMap` cache-or-build pattern
//! and `client_hub::ClientHub`'s double-check-lock posture, generalized
//! from "one handle per module" to "one handle per arbitrary connection ID"
//! and extended with the lazy/eager lifecycle spec.md requires.

use dashmap::DashMap;
use gateway_config::{ConnectionSpec, Dialect};
use gateway_db::DbHandle;
use gateway_errors::GatewayError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Connection Manager lifecycle mode (spec §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Connect and ping every configured database up front; partial
    /// success is allowed.
    Eager,
    /// Open exactly one health-check sample per distinct dialect; every
    /// other database opens on first `get_database`.
    Lazy,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub open_count: usize,
    pub by_dialect: [(Dialect, usize); 4],
}

/// Slot holding the on-demand-open single-flight cell for one connection
/// ID. `OnceCell::get_or_try_init` guarantees at most one open attempt
/// across concurrent callers (spec §8's quantified invariant), and a
/// failed attempt resets the cell so a later call can retry.
type Slot = Arc<OnceCell<Arc<DbHandle>>>;

pub struct ConnectionManager {
    specs: HashMap<String, ConnectionSpec>,
    handles: DashMap<String, Slot>,
    lifecycle: Lifecycle,
}

impl ConnectionManager {
    pub fn new(specs: Vec<ConnectionSpec>, lifecycle: Lifecycle) -> Self {
        let specs = specs.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            specs,
            handles: DashMap::new(),
            lifecycle,
        }
    }

    /// Run the manager's startup lifecycle (spec §4.3). Eager mode opens
    /// every configured database, returning the first failure while
    /// leaving already-opened handles in place. Lazy mode opens one
    /// health-check sample per distinct dialect.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        match self.lifecycle {
            Lifecycle::Eager => self.connect_eager().await,
            Lifecycle::Lazy => self.health_check_sample().await,
        }
    }

    async fn connect_eager(&self) -> Result<(), GatewayError> {
        let mut first_err = None;
        for id in self.specs.keys().cloned().collect::<Vec<_>>() {
            if let Err(e) = self.open(&id).await {
                tracing::warn!(db_id = %id, error = %e, "eager connect failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Opens exactly one adapter per distinct dialect present in the
    /// config (spec §8: "Ten configured databases with lazy mode: exactly
    /// `len(distinct dialects)` pings during `Connect()`").
    pub async fn health_check_sample(&self) -> Result<(), GatewayError> {
        let mut seen = std::collections::HashSet::new();
        let mut sample_ids = Vec::new();
        for spec in self.specs.values() {
            if seen.insert(spec.dialect) {
                sample_ids.push(spec.id.clone());
            }
        }

        let mut first_err = None;
        for id in sample_ids {
            if let Err(e) = self.open(&id).await {
                tracing::warn!(db_id = %id, error = %e, "lazy health-check sample failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn slot_for(&self, id: &str) -> Slot {
        self.handles
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn open(&self, id: &str) -> Result<Arc<DbHandle>, GatewayError> {
        let spec = self
            .specs
            .get(id)
            .ok_or_else(|| GatewayError::connection(id, "unknown connection id"))?;
        let slot = self.slot_for(id);
        slot.get_or_try_init(|| async {
            tracing::info!(db_id = %id, dialect = %spec.dialect, "opening database connection");
            let handle = DbHandle::connect(spec).await?;
            Ok::<_, GatewayError>(Arc::new(handle))
        })
        .await
        .cloned()
    }

    /// On-demand open, thread-safe via `OnceCell` single-flight: multiple
    /// concurrent callers for the same ID observe exactly one open attempt
    /// and all return the same handle (spec §4.3).
    pub async fn get_database(&self, id: &str) -> Result<Arc<DbHandle>, GatewayError> {
        self.open(id).await
    }

    /// Returns the dialect tag *without* opening a pool, regardless of
    /// lazy/eager mode (spec §8's quantified invariant).
    pub fn get_database_type(&self, id: &str) -> Result<Dialect, GatewayError> {
        self.specs
            .get(id)
            .map(|s| s.dialect)
            .ok_or_else(|| GatewayError::connection(id, "unknown connection id"))
    }

    pub fn list_databases(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.specs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Removes the entry and closes the underlying pool.
    pub async fn close(&self, id: &str) -> Result<(), GatewayError> {
        if let Some((_, slot)) = self.handles.remove(id) {
            // If no other reference to the cell is in flight, we can take the
            // handle out and close it; otherwise a concurrent opener wins the
            // race and the handle is closed implicitly on its own drop.
            if let Ok(cell) = Arc::try_unwrap(slot) {
                if let Some(handle) = cell.into_inner() {
                    if let Ok(handle) = Arc::try_unwrap(handle) {
                        handle.close().await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Closes every entry, reporting the first error while continuing
    /// (spec §4.3).
    pub async fn close_all(&self) -> Result<(), GatewayError> {
        let ids: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        let mut first_err = None;
        for id in ids {
            if let Err(e) = self.close(&id).await {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Open count and per-dialect breakdown, used by the `list_databases`
    /// tool and structured log fields (SPEC_FULL.md §4).
    pub fn stats(&self) -> Stats {
        let mut by_dialect = [
            (Dialect::Mysql, 0usize),
            (Dialect::Postgres, 0),
            (Dialect::Sqlite, 0),
            (Dialect::Oracle, 0),
        ];
        let mut open_count = 0;
        for entry in self.handles.iter() {
            if let Some(handle) = entry.value().get() {
                open_count += 1;
                if let Some(slot) = by_dialect.iter_mut().find(|(d, _)| *d == handle.dialect()) {
                    slot.1 += 1;
                }
            }
        }
        Stats {
            open_count,
            by_dialect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::Dialect;
    use std::collections::HashMap as Map;

    fn sqlite_spec(id: &str) -> ConnectionSpec {
        ConnectionSpec {
            id: id.to_string(),
            dialect: Dialect::Sqlite,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            ssl_mode: None,
            ssl_cert: None,
            ssl_key: None,
            ssl_root_cert: None,
            application_name: None,
            target_session_attrs: None,
            options: Map::new(),
            service_name: None,
            sid: None,
            wallet_dir: None,
            tns_admin: None,
            tns_alias: None,
            edition: None,
            pooling: None,
            standby: None,
            nls_lang: None,
            file: Some(":memory:".into()),
            cipher_key: None,
            read_only: None,
            cache_size: Some(2000),
            journal_mode: None,
            driver_variant: None,
            max_open: Some(5),
            max_idle: Some(1),
            max_lifetime_secs: None,
            max_idle_time_secs: None,
            connect_timeout_secs: Some(5),
            query_timeout_secs: Some(30),
        }
    }

    #[tokio::test]
    async fn get_database_type_never_opens_pool() {
        let mgr = ConnectionManager::new(vec![sqlite_spec("a")], Lifecycle::Lazy);
        assert_eq!(mgr.get_database_type("a").unwrap(), Dialect::Sqlite);
        assert_eq!(mgr.stats().open_count, 0);
    }

    #[tokio::test]
    async fn concurrent_get_database_opens_once() {
        let mgr = Arc::new(ConnectionManager::new(vec![sqlite_spec("a")], Lifecycle::Lazy));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = mgr.clone();
            handles.push(tokio::spawn(async move { mgr.get_database("a").await.unwrap() }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        assert_eq!(mgr.stats().open_count, 1);
        for r in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], r));
        }
    }

    #[tokio::test]
    async fn lazy_mode_opens_one_per_distinct_dialect() {
        let specs = vec![sqlite_spec("a"), sqlite_spec("b"), sqlite_spec("c")];
        let mgr = ConnectionManager::new(specs, Lifecycle::Lazy);
        mgr.connect().await.unwrap();
        assert_eq!(mgr.stats().open_count, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_connection_error() {
        let mgr = ConnectionManager::new(vec![sqlite_spec("a")], Lifecycle::Lazy);
        assert!(mgr.get_database("missing").await.is_err());
    }

    #[tokio::test]
    async fn list_databases_sorted() {
        let mgr = ConnectionManager::new(
            vec![sqlite_spec("zebra"), sqlite_spec("apple")],
            Lifecycle::Lazy,
        );
        assert_eq!(mgr.list_databases(), vec!["apple", "zebra"]);
    }
}
