//! C2 Driver Adapter: one concrete adapter per dialect. Builds DSNs, opens
//! pools, applies post-connect configuration, and exposes a uniform
//! query/execute/transaction surface over MySQL, PostgreSQL, SQLite, and
//! Oracle (spec §4.2).

pub mod dsn;
pub mod handle;
#[cfg(feature = "oracle")]
pub mod oracle_pool;
#[cfg(feature = "oracle")]
pub mod oracle_query;
mod pool_opts;
pub mod query;
pub mod tx;

pub use dsn::{build_dsn, mask_dsn};
pub use handle::{DbHandle, DbPool};
pub use query::{execute_query, execute_statement, ColumnValue, ExecResult, QueryRows};
pub use tx::DbTransaction;
