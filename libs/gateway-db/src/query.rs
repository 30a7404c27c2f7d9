//! Dialect-agnostic query/execute surface used by `gateway-core`'s
//! `ExecuteQuery`/`ExecuteStatement` and by `gateway-tx`'s
//! `TransactionExecute` (spec §4.6).

use crate::handle::{DbHandle, DbPool};
use gateway_errors::GatewayError;
use serde_json::Value;

/// One decoded cell. Kept deliberately small — the use-case layer only
/// ever renders these as text (spec §4.6's "formatted row table").
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::Bool(b) => write!(f, "{b}"),
            ColumnValue::Int(i) => write!(f, "{i}"),
            ColumnValue::Float(v) => write!(f, "{v}"),
            ColumnValue::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ColumnValue>>,
}

#[derive(Clone, Debug)]
pub struct ExecResult {
    /// `-1` when the driver cannot supply it (spec §4.4).
    pub rows_affected: i64,
    pub last_insert_id: i64,
}

/// `SELECT` vs. everything else, by case-insensitive leading keyword
/// (spec §4.4).
pub fn is_query(statement: &str) -> bool {
    statement
        .trim_start()
        .get(..6)
        .map(|s| s.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

fn json_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

macro_rules! decode_cell {
    ($row:expr, $idx:expr, $db:ty) => {{
        if let Ok(v) = $row.try_get::<Option<i64>, _>($idx) {
            v.map(ColumnValue::Int).unwrap_or(ColumnValue::Null)
        } else if let Ok(v) = $row.try_get::<Option<f64>, _>($idx) {
            v.map(ColumnValue::Float).unwrap_or(ColumnValue::Null)
        } else if let Ok(v) = $row.try_get::<Option<bool>, _>($idx) {
            v.map(ColumnValue::Bool).unwrap_or(ColumnValue::Null)
        } else if let Ok(v) = $row.try_get::<Option<String>, _>($idx) {
            v.map(ColumnValue::Text).unwrap_or(ColumnValue::Null)
        } else {
            ColumnValue::Null
        }
    }};
}

#[cfg(feature = "postgres")]
fn bind_pg<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for p in params {
        q = match p {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) if n.is_i64() => q.bind(n.as_i64().unwrap()),
            Value::Number(n) => q.bind(n.as_f64().unwrap_or_default()),
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(json_to_string(other)),
        };
    }
    q
}

#[cfg(feature = "postgres")]
pub async fn run_query_postgres(
    pool: &sqlx::PgPool,
    sql: &str,
    params: &[Value],
) -> Result<QueryRows, GatewayError> {
    use sqlx::Row;
    let q = bind_pg(sqlx::query(sql), params);
    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| GatewayError::driver("query", e.to_string()))?;

    let columns = rows
        .first()
        .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(row.columns().len());
        for idx in 0..row.columns().len() {
            cells.push(decode_cell!(row, idx, sqlx::Postgres));
        }
        out.push(cells);
    }
    Ok(QueryRows { columns, rows: out })
}

#[cfg(feature = "postgres")]
pub async fn run_exec_postgres(
    pool: &sqlx::PgPool,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult, GatewayError> {
    let q = bind_pg(sqlx::query(sql), params);
    let result = q
        .execute(pool)
        .await
        .map_err(|e| GatewayError::driver("execute", e.to_string()))?;
    Ok(ExecResult {
        rows_affected: result.rows_affected() as i64,
        last_insert_id: -1,
    })
}

#[cfg(feature = "mysql")]
fn bind_mysql<'q>(
    mut q: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    for p in params {
        q = match p {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) if n.is_i64() => q.bind(n.as_i64().unwrap()),
            Value::Number(n) => q.bind(n.as_f64().unwrap_or_default()),
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(json_to_string(other)),
        };
    }
    q
}

#[cfg(feature = "mysql")]
pub async fn run_query_mysql(
    pool: &sqlx::MySqlPool,
    sql: &str,
    params: &[Value],
) -> Result<QueryRows, GatewayError> {
    use sqlx::Row;
    let q = bind_mysql(sqlx::query(sql), params);
    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| GatewayError::driver("query", e.to_string()))?;

    let columns = rows
        .first()
        .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(row.columns().len());
        for idx in 0..row.columns().len() {
            cells.push(decode_cell!(row, idx, sqlx::MySql));
        }
        out.push(cells);
    }
    Ok(QueryRows { columns, rows: out })
}

#[cfg(feature = "mysql")]
pub async fn run_exec_mysql(
    pool: &sqlx::MySqlPool,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult, GatewayError> {
    let q = bind_mysql(sqlx::query(sql), params);
    let result = q
        .execute(pool)
        .await
        .map_err(|e| GatewayError::driver("execute", e.to_string()))?;
    Ok(ExecResult {
        rows_affected: result.rows_affected() as i64,
        last_insert_id: result.last_insert_id() as i64,
    })
}

#[cfg(feature = "sqlite")]
fn bind_sqlite<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for p in params {
        q = match p {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) if n.is_i64() => q.bind(n.as_i64().unwrap()),
            Value::Number(n) => q.bind(n.as_f64().unwrap_or_default()),
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(json_to_string(other)),
        };
    }
    q
}

#[cfg(feature = "sqlite")]
pub async fn run_query_sqlite(
    pool: &sqlx::SqlitePool,
    sql: &str,
    params: &[Value],
) -> Result<QueryRows, GatewayError> {
    use sqlx::Row;
    let q = bind_sqlite(sqlx::query(sql), params);
    let rows = q
        .fetch_all(pool)
        .await
        .map_err(|e| GatewayError::driver("query", e.to_string()))?;

    let columns = rows
        .first()
        .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(row.columns().len());
        for idx in 0..row.columns().len() {
            cells.push(decode_cell!(row, idx, sqlx::Sqlite));
        }
        out.push(cells);
    }
    Ok(QueryRows { columns, rows: out })
}

#[cfg(feature = "sqlite")]
pub async fn run_exec_sqlite(
    pool: &sqlx::SqlitePool,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult, GatewayError> {
    let q = bind_sqlite(sqlx::query(sql), params);
    let result = q
        .execute(pool)
        .await
        .map_err(|e| GatewayError::driver("execute", e.to_string()))?;
    Ok(ExecResult {
        rows_affected: result.rows_affected() as i64,
        last_insert_id: result.last_insert_rowid(),
    })
}

/// Dispatch `SELECT`-shaped statements to the right backend, wrapped in
/// the database's configured query timeout (spec §4.6).
pub async fn execute_query(
    handle: &DbHandle,
    sql: &str,
    params: &[Value],
) -> Result<QueryRows, GatewayError> {
    let fut = async {
        match handle.pool() {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => run_query_postgres(pool, sql, params).await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => run_query_mysql(pool, sql, params).await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(pool) => run_query_sqlite(pool, sql, params).await,
            #[cfg(feature = "oracle")]
            DbPool::Oracle(pool) => crate::oracle_query::run_query_oracle(pool.clone(), sql, params).await,
        }
    };
    tokio::time::timeout(handle.query_timeout, fut)
        .await
        .map_err(|_| GatewayError::timeout(handle.query_timeout))?
}

pub async fn execute_statement(
    handle: &DbHandle,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult, GatewayError> {
    let fut = async {
        match handle.pool() {
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => run_exec_postgres(pool, sql, params).await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => run_exec_mysql(pool, sql, params).await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(pool) => run_exec_sqlite(pool, sql, params).await,
            #[cfg(feature = "oracle")]
            DbPool::Oracle(pool) => crate::oracle_query::run_exec_oracle(pool.clone(), sql, params).await,
        }
    };
    tokio::time::timeout(handle.query_timeout, fut)
        .await
        .map_err(|_| GatewayError::timeout(handle.query_timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_query_detects_select_case_insensitively() {
        assert!(is_query("select 1"));
        assert!(is_query("  SELECT * FROM t"));
        assert!(!is_query("insert into t values (1)"));
        assert!(!is_query("UPDATE t SET x=1"));
    }
}
