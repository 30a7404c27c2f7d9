//! Oracle query/execute/transaction-execute support, dispatched through
//! `oracle_pool::run_blocking`'s `spawn_blocking` bridge (spec §4.2/§4.6).
//!
//! Every cell is read back as `Option<String>` rather than probed for its
//! native type the way the sqlx backends are (`crate::query`'s
//! `decode_cell!`): the Oracle driver coerces any column type to text on
//! request, and the use-case layer only ever renders cells as text anyway
//! (spec §4.6's "formatted row table"), so there is no information lost by
//! standardizing on one path here.

use crate::oracle_pool::OraclePool;
use crate::query::{ColumnValue, ExecResult, QueryRows};
use gateway_errors::GatewayError;
use oracle::sql_type::ToSql;
use serde_json::Value;

/// Boxes a JSON value as an Oracle bind parameter. `:1`-style positional
/// binds (spec §4.5) are passed in argument order.
fn to_bind(v: &Value) -> Box<dyn ToSql> {
    match v {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) if n.is_i64() => Box::new(n.as_i64().unwrap()),
        Value::Number(n) => Box::new(n.as_f64().unwrap_or_default()),
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn bind_refs(params: &[Value]) -> Vec<Box<dyn ToSql>> {
    params.iter().map(to_bind).collect()
}

fn row_to_cells(row: &oracle::Row) -> Vec<ColumnValue> {
    row.column_info()
        .iter()
        .enumerate()
        .map(|(idx, _)| match row.get::<usize, Option<String>>(idx) {
            Ok(Some(s)) => ColumnValue::Text(s),
            Ok(None) => ColumnValue::Null,
            Err(_) => ColumnValue::Null,
        })
        .collect()
}

pub async fn run_query_oracle(
    pool: OraclePool,
    sql: &str,
    params: &[Value],
) -> Result<QueryRows, GatewayError> {
    let sql = sql.to_string();
    let params = params.to_vec();
    crate::oracle_pool::run_blocking(pool, move |conn| {
        let binds = bind_refs(&params);
        let bind_refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let result_set = conn.query(&sql, &bind_refs)?;
        let columns = result_set
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut rows = Vec::new();
        for row in result_set {
            rows.push(row_to_cells(&row?));
        }
        Ok(QueryRows { columns, rows })
    })
    .await
}

pub async fn run_exec_oracle(
    pool: OraclePool,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult, GatewayError> {
    let sql = sql.to_string();
    let params = params.to_vec();
    crate::oracle_pool::run_blocking(pool, move |conn| {
        let binds = bind_refs(&params);
        let bind_refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let mut stmt = conn.statement(&sql).build()?;
        stmt.execute(&bind_refs)?;
        conn.commit()?;
        let rows_affected = stmt.row_count().unwrap_or(0) as i64;
        // Oracle has no driver-level "last insert id" equivalent to
        // MySQL's auto-increment/SQLite's rowid — identity columns are
        // populated via sequences the caller already knows (spec §4.4:
        // "either may be `-1` when the driver cannot supply it").
        Ok(ExecResult {
            rows_affected,
            last_insert_id: -1,
        })
    })
    .await
}

/// Runs one statement directly against an already-checked-out Oracle
/// connection, for `gateway-tx`'s open-transaction path (spec §4.4's
/// `Execute(id, statement, params)`). The connection itself is the
/// transaction boundary in Oracle's driver model — there is no separate
/// transaction handle to thread through.
fn run_query_blocking(
    conn: &oracle::Connection,
    sql: &str,
    bind_refs: &[&dyn ToSql],
) -> Result<QueryRows, GatewayError> {
    let result_set = conn
        .query(sql, bind_refs)
        .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
    let columns = result_set
        .column_info()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut rows = Vec::new();
    for row in result_set {
        let row = row.map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
        rows.push(row_to_cells(&row));
    }
    Ok(QueryRows { columns, rows })
}

fn run_exec_blocking(
    conn: &oracle::Connection,
    sql: &str,
    bind_refs: &[&dyn ToSql],
) -> Result<ExecResult, GatewayError> {
    let mut stmt = conn
        .statement(sql)
        .build()
        .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
    stmt.execute(bind_refs)
        .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?;
    Ok(ExecResult {
        rows_affected: stmt.row_count().unwrap_or(0) as i64,
        last_insert_id: -1,
    })
}

pub async fn execute_in_tx(
    conn: oracle::Connection,
    sql: &str,
    params: &[Value],
    is_query: bool,
) -> Result<(oracle::Connection, Result<QueryRows, ExecResult>), GatewayError> {
    let sql = sql.to_string();
    let params = params.to_vec();
    tokio::task::spawn_blocking(move || {
        let binds = bind_refs(&params);
        let bind_refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();

        let outcome = if is_query {
            run_query_blocking(&conn, &sql, &bind_refs).map(Ok)
        } else {
            run_exec_blocking(&conn, &sql, &bind_refs).map(Err)
        }?;
        Ok::<_, GatewayError>((conn, outcome))
    })
    .await
    .map_err(|e| GatewayError::driver("transaction_execute", e.to_string()))?
}
