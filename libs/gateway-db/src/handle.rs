//! C2 Driver Adapter: DSN formation, pool opening, ping, post-connect
//! pragmas (spec §4.2). Grounded in `modkit_db::{DbHandle, DbPool,
//! DbTransaction}`, generalized from three backends to four.

use crate::dsn::{build_dsn, mask_dsn};
use crate::pool_opts::ApplyPoolOpts;
use gateway_config::{ConnectionSpec, Dialect};
use gateway_errors::GatewayError;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub enum DbPool {
    #[cfg(feature = "postgres")]
    Postgres(sqlx::PgPool),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "oracle")]
    Oracle(crate::oracle_pool::OraclePool),
}

pub struct DbHandle {
    pub id: String,
    pub dialect: Dialect,
    pool: DbPool,
    dsn: String,
    pub query_timeout: Duration,
}

impl DbHandle {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// DSN with password (and cipher key) replaced by `***`, for safe
    /// telemetry (spec §4.2).
    pub fn connection_string(&self) -> String {
        mask_dsn(self.dialect, &self.dsn)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Open a pooled handle for `spec`, applying pool settings and a
    /// 5-second ping (spec §4.2 (ii)/(iii)).
    pub async fn connect(spec: &ConnectionSpec) -> Result<Self, GatewayError> {
        let dsn = build_dsn(spec);
        let query_timeout = Duration::from_secs(spec.query_timeout_secs.unwrap_or(30));

        let pool = match spec.dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => {
                let opts = sqlx::postgres::PgPoolOptions::new().apply(spec);
                let pool = tokio::time::timeout(PING_TIMEOUT, opts.connect(&dsn))
                    .await
                    .map_err(|_| GatewayError::timeout(PING_TIMEOUT))?
                    .map_err(|e| GatewayError::connection(&spec.id, e.to_string()))?;
                DbPool::Postgres(pool)
            }
            #[cfg(feature = "mysql")]
            Dialect::Mysql => {
                let opts = sqlx::mysql::MySqlPoolOptions::new().apply(spec);
                let pool = tokio::time::timeout(PING_TIMEOUT, opts.connect(&dsn))
                    .await
                    .map_err(|_| GatewayError::timeout(PING_TIMEOUT))?
                    .map_err(|e| GatewayError::connection(&spec.id, e.to_string()))?;
                DbPool::MySql(pool)
            }
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => {
                let cache_size = spec.cache_size.unwrap_or(2000) as i64;
                let mut opts = sqlx::sqlite::SqlitePoolOptions::new().apply(spec);
                opts = opts.after_connect(move |conn, _meta| {
                    Box::pin(async move {
                        // spec §4.2: cache_size/synchronous/temp_store/mmap_size are
                        // applied post-connect; warnings are logged, not fatal.
                        for stmt in [
                            format!("PRAGMA cache_size={cache_size}"),
                            "PRAGMA synchronous=NORMAL".to_string(),
                            "PRAGMA temp_store=MEMORY".to_string(),
                            "PRAGMA mmap_size=268435456".to_string(),
                        ] {
                            if let Err(e) = sqlx::query(&stmt).execute(&mut *conn).await {
                                tracing::warn!(pragma = %stmt, error = %e, "sqlite pragma failed");
                            }
                        }
                        Ok(())
                    })
                });
                let pool = tokio::time::timeout(PING_TIMEOUT, opts.connect(&dsn))
                    .await
                    .map_err(|_| GatewayError::timeout(PING_TIMEOUT))?
                    .map_err(|e| GatewayError::connection(&spec.id, e.to_string()))?;
                DbPool::Sqlite(pool)
            }
            #[cfg(feature = "oracle")]
            Dialect::Oracle => {
                let spec = spec.clone();
                let dsn_for_pool = dsn.clone();
                let pool = tokio::task::spawn_blocking(move || {
                    crate::oracle_pool::build_pool(&dsn_for_pool, &spec)
                })
                .await
                .map_err(|e| GatewayError::driver("oracle:spawn_blocking", e.to_string()))??;
                DbPool::Oracle(pool)
            }
            #[cfg(not(all(feature = "postgres", feature = "mysql", feature = "sqlite", feature = "oracle")))]
            #[allow(unreachable_patterns)]
            other => {
                return Err(GatewayError::ConfigError(format!(
                    "dialect '{other}' not enabled in this build"
                )))
            }
        };

        Ok(Self {
            id: spec.id.clone(),
            dialect: spec.dialect,
            pool,
            dsn,
            query_timeout,
        })
    }

    pub async fn close(self) {
        match self.pool {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
            #[cfg(feature = "oracle")]
            DbPool::Oracle(_) => {}
        }
    }

    #[cfg(feature = "postgres")]
    pub fn sqlx_postgres(&self) -> Option<&sqlx::PgPool> {
        match &self.pool {
            DbPool::Postgres(p) => Some(p),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "mysql")]
    pub fn sqlx_mysql(&self) -> Option<&sqlx::MySqlPool> {
        match &self.pool {
            DbPool::MySql(p) => Some(p),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlx_sqlite(&self) -> Option<&sqlx::SqlitePool> {
        match &self.pool {
            DbPool::Sqlite(p) => Some(p),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "oracle")]
    pub fn oracle_pool(&self) -> Option<crate::oracle_pool::OraclePool> {
        match &self.pool {
            DbPool::Oracle(p) => Some(p.clone()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::Dialect;
    use std::collections::HashMap;

    fn sqlite_spec() -> ConnectionSpec {
        ConnectionSpec {
            id: "mem1".into(),
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
            options: HashMap::new(),
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
    async fn connects_to_in_memory_sqlite() {
        let spec = sqlite_spec();
        let handle = DbHandle::connect(&spec).await.unwrap();
        assert_eq!(handle.dialect(), Dialect::Sqlite);
        assert_eq!(handle.connection_string(), ":memory:");
        handle.close().await;
    }

    #[tokio::test]
    async fn runs_a_query_against_sqlite() {
        let spec = sqlite_spec();
        let handle = DbHandle::connect(&spec).await.unwrap();
        let pool = handle.sqlx_sqlite().unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await.unwrap();
        assert_eq!(row.0, 1);
    }
}
