//! Dedup'd pool-options application across sqlx backends, same pattern as
//! `modkit_db::pool_opts::ApplyPoolOpts`.

use gateway_config::ConnectionSpec;
use std::time::Duration;

pub(crate) trait ApplyPoolOpts {
    fn apply(self, spec: &ConnectionSpec) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($t:ty) => {
        impl ApplyPoolOpts for $t {
            fn apply(self, spec: &ConnectionSpec) -> Self {
                let mut opts = self;
                if let Some(n) = spec.max_open {
                    opts = opts.max_connections(n);
                }
                if let Some(n) = spec.max_idle {
                    opts = opts.min_connections(n);
                }
                if let Some(secs) = spec.connect_timeout_secs {
                    opts = opts.acquire_timeout(Duration::from_secs(secs));
                }
                if let Some(secs) = spec.max_idle_time_secs {
                    opts = opts.idle_timeout(Duration::from_secs(secs));
                }
                if let Some(secs) = spec.max_lifetime_secs {
                    opts = opts.max_lifetime(Duration::from_secs(secs));
                }
                opts
            }
        }
    };
}

#[cfg(feature = "postgres")]
impl_apply_pool_opts!(sqlx::postgres::PgPoolOptions);
#[cfg(feature = "mysql")]
impl_apply_pool_opts!(sqlx::mysql::MySqlPoolOptions);
#[cfg(feature = "sqlite")]
impl_apply_pool_opts!(sqlx::sqlite::SqlitePoolOptions);
