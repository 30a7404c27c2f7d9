//! Per-backend transaction handles. `sqlx::Pool::begin()` returns a
//! `Transaction<'static, DB>` (the pool clones its connection in), so these
//! variants can be stored in `gateway-tx`'s registry across independent RPC
//! calls without borrowing the pool.

use crate::handle::{DbHandle, DbPool};
use crate::query::{ColumnValue, ExecResult, QueryRows};
use gateway_errors::GatewayError;
use serde_json::Value;

pub enum DbTransaction {
    #[cfg(feature = "postgres")]
    Postgres(sqlx::Transaction<'static, sqlx::Postgres>),
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'static, sqlx::MySql>),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'static, sqlx::Sqlite>),
    /// `None` only while a call into `oracle_query::execute_in_tx` has
    /// taken the connection across its `spawn_blocking` bridge; it is
    /// always restored to `Some` before `execute_in_tx` returns.
    #[cfg(feature = "oracle")]
    Oracle(Option<oracle::Connection>),
}

pub async fn begin(handle: &DbHandle) -> Result<DbTransaction, GatewayError> {
    match handle.pool() {
        #[cfg(feature = "postgres")]
        DbPool::Postgres(pool) => Ok(DbTransaction::Postgres(
            pool.begin()
                .await
                .map_err(|e| GatewayError::driver("begin", e.to_string()))?,
        )),
        #[cfg(feature = "mysql")]
        DbPool::MySql(pool) => Ok(DbTransaction::MySql(
            pool.begin()
                .await
                .map_err(|e| GatewayError::driver("begin", e.to_string()))?,
        )),
        #[cfg(feature = "sqlite")]
        DbPool::Sqlite(pool) => Ok(DbTransaction::Sqlite(
            pool.begin()
                .await
                .map_err(|e| GatewayError::driver("begin", e.to_string()))?,
        )),
        #[cfg(feature = "oracle")]
        DbPool::Oracle(pool) => {
            let pool = pool.clone();
            tokio::task::spawn_blocking(move || {
                pool.get()
                    .map_err(|e| GatewayError::driver("begin", e.to_string()))
            })
            .await
            .map_err(|e| GatewayError::driver("begin", e.to_string()))?
            .map(|conn| DbTransaction::Oracle(Some(conn)))
        }
    }
}

macro_rules! query_in_tx {
    ($tx:expr, $sql:expr, $params:expr, $db:ty) => {{
        use sqlx::Row;
        let mut q = sqlx::query($sql);
        for p in $params {
            q = match p {
                Value::Null => q.bind(None::<String>),
                Value::Bool(b) => q.bind(*b),
                Value::Number(n) if n.is_i64() => q.bind(n.as_i64().unwrap()),
                Value::Number(n) => q.bind(n.as_f64().unwrap_or_default()),
                Value::String(s) => q.bind(s.clone()),
                other => q.bind(other.to_string()),
            };
        }
        let rows = q
            .fetch_all(&mut **$tx)
            .await
            .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(row.columns().len());
            for idx in 0..row.columns().len() {
                let v = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                    v.map(ColumnValue::Int).unwrap_or(ColumnValue::Null)
                } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
                    v.map(ColumnValue::Float).unwrap_or(ColumnValue::Null)
                } else if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
                    v.map(ColumnValue::Bool).unwrap_or(ColumnValue::Null)
                } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
                    v.map(ColumnValue::Text).unwrap_or(ColumnValue::Null)
                } else {
                    ColumnValue::Null
                };
                cells.push(v);
            }
            out.push(cells);
        }
        Ok(QueryRows { columns, rows: out })
    }};
}

macro_rules! exec_in_tx {
    ($tx:expr, $sql:expr, $params:expr, $last_id:expr) => {{
        let mut q = sqlx::query($sql);
        for p in $params {
            q = match p {
                Value::Null => q.bind(None::<String>),
                Value::Bool(b) => q.bind(*b),
                Value::Number(n) if n.is_i64() => q.bind(n.as_i64().unwrap()),
                Value::Number(n) => q.bind(n.as_f64().unwrap_or_default()),
                Value::String(s) => q.bind(s.clone()),
                other => q.bind(other.to_string()),
            };
        }
        let result = q
            .execute(&mut **$tx)
            .await
            .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
        Ok(ExecResult {
            rows_affected: result.rows_affected() as i64,
            last_insert_id: $last_id(&result),
        })
    }};
}

/// Run one statement inside an already-open transaction (spec §4.4's
/// `Execute(id, statement, params)`).
pub async fn execute_in_tx(
    tx: &mut DbTransaction,
    sql: &str,
    params: &[Value],
    is_query: bool,
) -> Result<Result<QueryRows, ExecResult>, GatewayError> {
    match tx {
        #[cfg(feature = "postgres")]
        DbTransaction::Postgres(tx) => {
            if is_query {
                Ok(Ok(query_in_tx!(tx, sql, params, sqlx::Postgres)?))
            } else {
                Ok(Err(exec_in_tx!(tx, sql, params, |_r: &sqlx::postgres::PgQueryResult| -1i64)?))
            }
        }
        #[cfg(feature = "mysql")]
        DbTransaction::MySql(tx) => {
            if is_query {
                Ok(Ok(query_in_tx!(tx, sql, params, sqlx::MySql)?))
            } else {
                Ok(Err(exec_in_tx!(
                    tx,
                    sql,
                    params,
                    |r: &sqlx::mysql::MySqlQueryResult| r.last_insert_id() as i64
                )?))
            }
        }
        #[cfg(feature = "sqlite")]
        DbTransaction::Sqlite(tx) => {
            if is_query {
                Ok(Ok(query_in_tx!(tx, sql, params, sqlx::Sqlite)?))
            } else {
                Ok(Err(exec_in_tx!(
                    tx,
                    sql,
                    params,
                    |r: &sqlx::sqlite::SqliteQueryResult| r.last_insert_rowid()
                )?))
            }
        }
        #[cfg(feature = "oracle")]
        DbTransaction::Oracle(conn_slot) => {
            let conn = conn_slot.take().ok_or_else(|| {
                GatewayError::driver("transaction_execute", "oracle connection unavailable")
            })?;
            let (conn, outcome) =
                crate::oracle_query::execute_in_tx(conn, sql, params, is_query).await?;
            *conn_slot = Some(conn);
            Ok(outcome)
        }
    }
}

pub async fn commit(tx: DbTransaction) -> Result<(), GatewayError> {
    match tx {
        #[cfg(feature = "postgres")]
        DbTransaction::Postgres(tx) => tx
            .commit()
            .await
            .map_err(|e| GatewayError::driver("commit", e.to_string())),
        #[cfg(feature = "mysql")]
        DbTransaction::MySql(tx) => tx
            .commit()
            .await
            .map_err(|e| GatewayError::driver("commit", e.to_string())),
        #[cfg(feature = "sqlite")]
        DbTransaction::Sqlite(tx) => tx
            .commit()
            .await
            .map_err(|e| GatewayError::driver("commit", e.to_string())),
        #[cfg(feature = "oracle")]
        DbTransaction::Oracle(conn_slot) => {
            let conn = conn_slot
                .ok_or_else(|| GatewayError::driver("commit", "oracle connection unavailable"))?;
            tokio::task::spawn_blocking(move || {
                conn.commit()
                    .map_err(|e| GatewayError::driver("commit", e.to_string()))
            })
            .await
            .map_err(|e| GatewayError::driver("commit", e.to_string()))?
        }
    }
}

pub async fn rollback(tx: DbTransaction) -> Result<(), GatewayError> {
    match tx {
        #[cfg(feature = "postgres")]
        DbTransaction::Postgres(tx) => tx
            .rollback()
            .await
            .map_err(|e| GatewayError::driver("rollback", e.to_string())),
        #[cfg(feature = "mysql")]
        DbTransaction::MySql(tx) => tx
            .rollback()
            .await
            .map_err(|e| GatewayError::driver("rollback", e.to_string())),
        #[cfg(feature = "sqlite")]
        DbTransaction::Sqlite(tx) => tx
            .rollback()
            .await
            .map_err(|e| GatewayError::driver("rollback", e.to_string())),
        #[cfg(feature = "oracle")]
        DbTransaction::Oracle(conn_slot) => {
            let conn = conn_slot.ok_or_else(|| {
                GatewayError::driver("rollback", "oracle connection unavailable")
            })?;
            tokio::task::spawn_blocking(move || {
                conn.rollback()
                    .map_err(|e| GatewayError::driver("rollback", e.to_string()))
            })
            .await
            .map_err(|e| GatewayError::driver("rollback", e.to_string()))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::{ConnectionSpec, Dialect};
    use std::collections::HashMap;

    fn sqlite_spec() -> ConnectionSpec {
        ConnectionSpec {
            id: "tx1".into(),
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
    async fn begin_commit_roundtrip() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        let pool = handle.sqlx_sqlite().unwrap().clone();
        sqlx::query("CREATE TABLE t(id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = begin(&handle).await.unwrap();
        execute_in_tx(&mut tx, "INSERT INTO t(id) VALUES (1)", &[], false)
            .await
            .unwrap();
        commit(tx).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn begin_rollback_leaves_state_unchanged() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        let pool = handle.sqlx_sqlite().unwrap().clone();
        sqlx::query("CREATE TABLE t(id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = begin(&handle).await.unwrap();
        execute_in_tx(&mut tx, "INSERT INTO t(id) VALUES (42)", &[], false)
            .await
            .unwrap();
        rollback(tx).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t WHERE id=42")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
