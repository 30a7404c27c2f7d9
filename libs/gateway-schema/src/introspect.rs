//! Strategy execution and schema assembly (spec §4.5).

use crate::strategy::{self, CandidateQuery};
use gateway_config::Dialect;
use gateway_db::{ColumnValue, DbHandle, QueryRows};
use gateway_errors::GatewayError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// One row of a `columns` result, canonicalized by column name rather than
/// position (spec §4.5's guaranteed column-name contract).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    pub table_schema: String,
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub foreign_table_schema: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FullSchema {
    pub tables: Vec<String>,
    pub schema: HashMap<String, Vec<ColumnInfo>>,
    pub relationships: Vec<RelationshipInfo>,
}

fn cell_to_string(v: &ColumnValue) -> Option<String> {
    match v {
        ColumnValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn row_get(rows: &QueryRows, row: &[ColumnValue], name: &str) -> Option<String> {
    rows.columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .and_then(|idx| row.get(idx))
        .and_then(cell_to_string)
}

async fn run_candidates(
    handle: &DbHandle,
    db_id: &str,
    operation: &str,
    candidates: &[CandidateQuery],
    table: Option<&str>,
) -> Result<QueryRows, GatewayError> {
    if candidates.is_empty() {
        return Err(GatewayError::dialect(
            db_id,
            operation,
            "no candidate queries defined for this dialect",
        ));
    }

    let mut last_err: Option<GatewayError> = None;
    for candidate in candidates {
        let params: Vec<Value> = match table {
            Some(t) => std::iter::repeat(Value::String(t.to_string()))
                .take(candidate.table_binds)
                .collect(),
            None => Vec::new(),
        };
        match gateway_db::execute_query(handle, candidate.sql, &params).await {
            Ok(rows) => return Ok(rows),
            Err(e) => last_err = Some(e),
        }
    }
    Err(GatewayError::dialect(
        db_id,
        operation,
        last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "all candidate queries failed".to_string()),
    ))
}

pub async fn tables(handle: &DbHandle, db_id: &str) -> Result<Vec<String>, GatewayError> {
    let strategy = strategy::for_dialect(handle.dialect());
    let rows = run_candidates(handle, db_id, "tables", strategy.tables, None).await?;
    let idx = rows
        .columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case("table_name"))
        .ok_or_else(|| GatewayError::dialect(db_id, "tables", "missing table_name column"))?;
    Ok(rows
        .rows
        .iter()
        .filter_map(|r| r.get(idx).and_then(cell_to_string))
        .collect())
}

pub async fn columns(
    handle: &DbHandle,
    db_id: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>, GatewayError> {
    let strategy = strategy::for_dialect(handle.dialect());
    let rows = run_candidates(handle, db_id, "columns", strategy.columns, Some(table)).await?;
    Ok(rows
        .rows
        .iter()
        .map(|row| ColumnInfo {
            table_name: row_get(&rows, row, "table_name").unwrap_or_else(|| table.to_string()),
            column_name: row_get(&rows, row, "column_name").unwrap_or_default(),
            data_type: row_get(&rows, row, "data_type").unwrap_or_default(),
            is_nullable: row_get(&rows, row, "is_nullable").unwrap_or_else(|| "YES".to_string()),
            column_default: row_get(&rows, row, "column_default"),
        })
        .collect())
}

fn rows_to_relationships(rows: &QueryRows) -> Vec<RelationshipInfo> {
    rows.rows
        .iter()
        .map(|row| RelationshipInfo {
            table_schema: row_get(rows, row, "table_schema").unwrap_or_default(),
            constraint_name: row_get(rows, row, "constraint_name").unwrap_or_default(),
            table_name: row_get(rows, row, "table_name").unwrap_or_default(),
            column_name: row_get(rows, row, "column_name").unwrap_or_default(),
            foreign_table_schema: row_get(rows, row, "foreign_table_schema").unwrap_or_default(),
            foreign_table_name: row_get(rows, row, "foreign_table_name").unwrap_or_default(),
            foreign_column_name: row_get(rows, row, "foreign_column_name").unwrap_or_default(),
        })
        .collect()
}

pub async fn relationships(
    handle: &DbHandle,
    db_id: &str,
    table: Option<&str>,
) -> Result<Vec<RelationshipInfo>, GatewayError> {
    let strategy = strategy::for_dialect(handle.dialect());

    if let Some(t) = table {
        let rows = run_candidates(
            handle,
            db_id,
            "relationships",
            strategy.relationships_for_table,
            Some(t),
        )
        .await?;
        return Ok(rows_to_relationships(&rows));
    }

    if !strategy.relationships_all.is_empty() {
        let rows = run_candidates(
            handle,
            db_id,
            "relationships",
            strategy.relationships_all,
            None,
        )
        .await?;
        return Ok(rows_to_relationships(&rows));
    }

    // SQLite has no whole-schema foreign-key catalog; fan out the
    // per-table candidate over every known table instead.
    let mut out = Vec::new();
    for t in tables(handle, db_id).await? {
        let rows = run_candidates(
            handle,
            db_id,
            "relationships",
            strategy.relationships_for_table,
            Some(&t),
        )
        .await?;
        out.extend(rows_to_relationships(&rows));
    }
    Ok(out)
}

/// Assembles `{tables, schema: {table -> columns}, relationships}` (spec
/// §4.5's full-schema composition).
pub async fn full_schema(handle: &DbHandle, db_id: &str) -> Result<FullSchema, GatewayError> {
    let table_names = tables(handle, db_id).await?;
    let mut schema = HashMap::with_capacity(table_names.len());
    for t in &table_names {
        schema.insert(t.clone(), columns(handle, db_id, t).await?);
    }
    let relationships = relationships(handle, db_id, None).await?;
    Ok(FullSchema {
        tables: table_names,
        schema,
        relationships,
    })
}

/// Case-insensitive substring filter over table names, sorted ascending by
/// code point (spec §4.5/§8, literal scenario S6).
pub async fn filter_table_names(
    handle: &DbHandle,
    db_id: &str,
    pattern: &str,
) -> Result<Vec<String>, GatewayError> {
    if pattern.is_empty() {
        return Err(GatewayError::ParameterError(
            "pattern must be non-empty".to_string(),
        ));
    }
    let needle = pattern.to_ascii_lowercase();
    let mut matches: Vec<String> = tables(handle, db_id)
        .await?
        .into_iter()
        .filter(|t| t.to_ascii_lowercase().contains(&needle))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Placeholder token this dialect's catalog queries and ad-hoc statements
/// use (spec §4.5).
pub fn placeholder_style(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => "$1",
        Dialect::Mysql | Dialect::Sqlite => "?",
        Dialect::Oracle => ":1",
    }
}
