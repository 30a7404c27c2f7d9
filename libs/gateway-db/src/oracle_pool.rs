//! Oracle pooling. No mature async-native Oracle driver exists the way
//! sqlx covers mysql/postgres/sqlite, so the adapter follows the pattern
//! `sjtechdev-connector-x-pooling` uses for its blocking backends: a
//! synchronous `r2d2::Pool<r2d2_oracle::SessionManager>`, with every call
//! crossing into the pool via `tokio::task::spawn_blocking` so the blocking
//! work occupies a blocking-pool thread rather than suspending the reactor
//! (spec §5's suspension-point contract).

use gateway_config::ConnectionSpec;
use gateway_errors::GatewayError;
use r2d2_oracle::SessionManager;
use std::time::Duration;

pub type OraclePool = r2d2::Pool<SessionManager>;

pub fn build_pool(dsn: &str, spec: &ConnectionSpec) -> Result<OraclePool, GatewayError> {
    let user = spec.user.as_deref().unwrap_or_default();
    let password = spec.password.as_deref().unwrap_or_default();
    let manager = SessionManager::new(dsn, user, password);

    let mut builder = r2d2::Pool::builder();
    if let Some(n) = spec.max_open {
        builder = builder.max_size(n);
    }
    if let Some(n) = spec.max_idle {
        builder = builder.min_idle(Some(n));
    }
    if let Some(secs) = spec.connect_timeout_secs {
        builder = builder.connection_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = spec.max_lifetime_secs {
        builder = builder.max_lifetime(Some(Duration::from_secs(secs)));
    }

    builder
        .build(manager)
        .map_err(|e| GatewayError::connection(spec.id.clone(), format!("oracle pool build failed: {e}")))
}

/// Run a blocking Oracle closure on the blocking thread pool, mapping any
/// panic or driver error into a `GatewayError`.
pub async fn run_blocking<F, T>(pool: OraclePool, f: F) -> Result<T, GatewayError>
where
    F: FnOnce(&oracle::Connection) -> oracle::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| GatewayError::driver("oracle:get_connection", e.to_string()))?;
        f(&conn).map_err(|e| GatewayError::driver("oracle:execute", e.to_string()))
    })
    .await
    .map_err(|e| GatewayError::driver("oracle:spawn_blocking", e.to_string()))?
}
