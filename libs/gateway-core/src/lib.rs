//! C6 Use-Case Layer: stateless operations composing the Connection
//! Manager, Transaction Registry, and Dialect Strategies into the
//! operations `gateway-rpc`'s dispatcher calls (spec §4.6), plus the C9
//! Performance Tracker SPEC_FULL.md adds to give the `performance_*` tool
//! concrete semantics.

pub mod format;
pub mod perf;

use gateway_config::Dialect;
use gateway_errors::GatewayError;
use gateway_manager::ConnectionManager;
use gateway_schema::FullSchema;
use gateway_tx::TransactionRegistry;
use perf::{Metrics, PerformanceTracker, QuerySample};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which catalog the `schema_*` tool should assemble (spec §4.6/§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaComponent {
    Tables,
    Columns,
    Relationships,
    Full,
}

impl SchemaComponent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tables" => Some(Self::Tables),
            "columns" => Some(Self::Columns),
            "relationships" => Some(Self::Relationships),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// `performance_*` action enum (spec §6; semantics resolved in
/// SPEC_FULL.md §4's C9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerformanceAction {
    GetSlowQueries,
    GetMetrics,
    AnalyzeQuery,
    Reset,
    SetThreshold,
}

impl PerformanceAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "getSlowQueries" => Some(Self::GetSlowQueries),
            "getMetrics" => Some(Self::GetMetrics),
            "analyzeQuery" => Some(Self::AnalyzeQuery),
            "reset" => Some(Self::Reset),
            "setThreshold" => Some(Self::SetThreshold),
            _ => None,
        }
    }
}

/// Wraps the Connection Manager, Transaction Registry, and Performance
/// Tracker singletons that the use-case layer coordinates (spec §4.6). One
/// instance is shared across every RPC call for the process's lifetime.
pub struct GatewayCore {
    manager: Arc<ConnectionManager>,
    transactions: Arc<TransactionRegistry>,
    performance: Arc<PerformanceTracker>,
}

impl GatewayCore {
    pub fn new(manager: Arc<ConnectionManager>, transactions: Arc<TransactionRegistry>) -> Self {
        Self {
            manager,
            transactions,
            performance: Arc::new(PerformanceTracker::default()),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn performance(&self) -> &Arc<PerformanceTracker> {
        &self.performance
    }

    /// Resolves a deadline: the caller's per-call override when present,
    /// otherwise the database's configured query timeout already applied
    /// inside `gateway_db`'s own call (spec §4.6: "when absent, the
    /// configured query timeout is applied").
    async fn with_deadline<T, F>(
        &self,
        override_ms: Option<u64>,
        fut: F,
    ) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        match override_ms {
            Some(ms) => {
                let deadline = Duration::from_millis(ms);
                tokio::time::timeout(deadline, fut)
                    .await
                    .map_err(|_| GatewayError::timeout(deadline))?
            }
            None => fut.await,
        }
    }

    /// `ExecuteQuery`: formatted row table, recording a performance sample
    /// for every call (spec §4.6, SPEC_FULL.md's C9 expansion).
    pub async fn execute_query(
        &self,
        db_id: &str,
        sql: &str,
        params: &[Value],
        timeout_ms: Option<u64>,
    ) -> Result<String, GatewayError> {
        let handle = self.manager.get_database(db_id).await?;
        let started = Instant::now();
        let result = self
            .with_deadline(timeout_ms, gateway_db::execute_query(&handle, sql, params))
            .await;
        let rows_affected = result.as_ref().map(|r| r.rows.len() as i64).unwrap_or(-1);
        self.performance
            .record(db_id, sql, started.elapsed(), rows_affected);
        result.map(|rows| format::render_query_rows(&rows))
    }

    /// `ExecuteStatement`: `Rows affected: X\nLast insert ID: Y`.
    pub async fn execute_statement(
        &self,
        db_id: &str,
        sql: &str,
        params: &[Value],
        timeout_ms: Option<u64>,
    ) -> Result<String, GatewayError> {
        let handle = self.manager.get_database(db_id).await?;
        let started = Instant::now();
        let result = self
            .with_deadline(
                timeout_ms,
                gateway_db::execute_statement(&handle, sql, params),
            )
            .await;
        let rows_affected = result.as_ref().map(|r| r.rows_affected).unwrap_or(-1);
        self.performance
            .record(db_id, sql, started.elapsed(), rows_affected);
        result.map(|r| format::render_exec_result(&r))
    }

    /// `TransactionBegin`: opens a handle via the Connection Manager (which
    /// may trigger on-demand connect) and registers a new transaction.
    pub async fn transaction_begin(
        &self,
        db_id: &str,
        read_only: bool,
    ) -> Result<String, GatewayError> {
        let handle = self.manager.get_database(db_id).await?;
        self.transactions.begin(db_id, read_only, &handle).await
    }

    /// `TransactionExecute`: dispatches one statement against an already
    /// open transaction, rendering whichever side of the query/exec union
    /// the driver returned.
    pub async fn transaction_execute(
        &self,
        tx_id: &str,
        statement: &str,
        params: &[Value],
    ) -> Result<String, GatewayError> {
        let result = self.transactions.execute(tx_id, statement, params).await?;
        Ok(format::render_tx_execute(&result))
    }

    /// `TransactionCommit`.
    pub async fn transaction_commit(&self, tx_id: &str) -> Result<String, GatewayError> {
        self.transactions.commit(tx_id).await?;
        Ok(format!("Transaction {tx_id} committed"))
    }

    /// `TransactionRollback`.
    pub async fn transaction_rollback(&self, tx_id: &str) -> Result<String, GatewayError> {
        self.transactions.rollback(tx_id).await?;
        Ok(format!("Transaction {tx_id} rolled back"))
    }

    /// `SchemaIntrospect`: assembles the requested catalog component,
    /// returning the structured value the dispatcher serializes to text
    /// (spec §4.6).
    pub async fn schema_introspect(
        &self,
        db_id: &str,
        component: SchemaComponent,
        table: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let handle = self.manager.get_database(db_id).await?;
        match component {
            SchemaComponent::Tables => {
                let tables = gateway_schema::tables(&handle, db_id).await?;
                Ok(serde_json::json!({ "tables": tables }))
            }
            SchemaComponent::Columns => {
                let table = table.ok_or_else(|| {
                    GatewayError::ParameterError(
                        "'table' is required when component is 'columns'".to_string(),
                    )
                })?;
                let columns = gateway_schema::columns(&handle, db_id, table).await?;
                Ok(serde_json::to_value(columns)?)
            }
            SchemaComponent::Relationships => {
                let rels = gateway_schema::relationships(&handle, db_id, table).await?;
                Ok(serde_json::to_value(rels)?)
            }
            SchemaComponent::Full => {
                let schema: FullSchema = gateway_schema::full_schema(&handle, db_id).await?;
                Ok(serde_json::to_value(schema)?)
            }
        }
    }

    /// `FilterTableNames`: dialect-agnostic, case-insensitive substring
    /// match, sorted ascending (spec §4.5).
    pub async fn filter_table_names(
        &self,
        db_id: &str,
        pattern: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let handle = self.manager.get_database(db_id).await?;
        gateway_schema::filter_table_names(&handle, db_id, pattern).await
    }

    /// `ListDatabases`.
    pub fn list_databases(&self) -> Vec<String> {
        self.manager.list_databases()
    }

    /// `GetDatabaseType`: never opens a pool (spec §4.6/§8).
    pub fn get_database_type(&self, db_id: &str) -> Result<Dialect, GatewayError> {
        self.manager.get_database_type(db_id)
    }

    /// `performance_*`: dispatches the action enum against the shared
    /// tracker (SPEC_FULL.md's C9).
    pub async fn performance(
        &self,
        db_id: &str,
        action: PerformanceAction,
        query: Option<&str>,
        threshold_ms: Option<u64>,
    ) -> Result<Value, GatewayError> {
        match action {
            PerformanceAction::GetSlowQueries => {
                let samples = self.performance.slow_queries(Some(db_id));
                Ok(serde_json::json!({ "slowQueries": samples.iter().map(sample_to_json).collect::<Vec<_>>() }))
            }
            PerformanceAction::GetMetrics => {
                let metrics = self.performance.metrics(Some(db_id));
                Ok(metrics_to_json(&metrics))
            }
            PerformanceAction::AnalyzeQuery => {
                let query = query.ok_or_else(|| {
                    GatewayError::ParameterError(
                        "'query' is required for analyzeQuery".to_string(),
                    )
                })?;
                if !gateway_db::query::is_query(query) {
                    return Err(GatewayError::ParameterError(
                        "analyzeQuery only accepts read-only SELECT statements".to_string(),
                    ));
                }
                let handle = self.manager.get_database(db_id).await?;
                let explain = PerformanceTracker::explain_statement(handle.dialect(), query);
                let rows = gateway_db::execute_query(&handle, &explain, &[]).await?;
                Ok(serde_json::json!({ "plan": crate::format::render_query_rows(&rows) }))
            }
            PerformanceAction::Reset => {
                self.performance.reset();
                Ok(serde_json::json!({ "status": "reset" }))
            }
            PerformanceAction::SetThreshold => {
                let ms = threshold_ms.ok_or_else(|| {
                    GatewayError::ParameterError(
                        "'threshold' is required for setThreshold".to_string(),
                    )
                })?;
                self.performance.set_threshold(Duration::from_millis(ms));
                Ok(serde_json::json!({ "status": "threshold updated", "thresholdMs": ms }))
            }
        }
    }
}

fn sample_to_json(s: &QuerySample) -> Value {
    let timestamp = s
        .timestamp
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    serde_json::json!({
        "dbId": s.db_id,
        "query": s.query,
        "durationMs": s.duration.as_secs_f64() * 1000.0,
        "timestamp": timestamp,
        "rowsAffected": s.rows_affected,
    })
}

fn metrics_to_json(m: &Metrics) -> Value {
    serde_json::json!({
        "sampleCount": m.sample_count,
        "slowCount": m.slow_count,
        "avgMillis": m.avg_millis,
        "p95Millis": m.p95_millis,
        "maxMillis": m.max_millis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::{ConnectionSpec, Dialect as D};
    use gateway_manager::Lifecycle;
    use std::collections::HashMap;

    fn sqlite_spec(id: &str) -> ConnectionSpec {
        ConnectionSpec {
            id: id.to_string(),
            dialect: D::Sqlite,
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

    fn core(id: &str) -> GatewayCore {
        let manager = Arc::new(ConnectionManager::new(
            vec![sqlite_spec(id)],
            Lifecycle::Lazy,
        ));
        GatewayCore::new(manager, Arc::new(TransactionRegistry::new()))
    }

    #[tokio::test]
    async fn execute_query_renders_header_rows_and_total() {
        let core = core("db1");
        let text = core
            .execute_query("db1", "SELECT 1 AS n", &[], None)
            .await
            .unwrap();
        assert_eq!(text, "n\n1\n\nTotal rows: 1");
    }

    #[tokio::test]
    async fn execute_statement_renders_rows_affected() {
        let core = core("db1");
        core.execute_statement("db1", "CREATE TABLE t(id INTEGER)", &[], None)
            .await
            .unwrap();
        let text = core
            .execute_statement("db1", "INSERT INTO t(id) VALUES (1)", &[], None)
            .await
            .unwrap();
        assert!(text.starts_with("Rows affected: 1"));
    }

    #[tokio::test]
    async fn transaction_roundtrip_through_core() {
        let core = core("db1");
        core.execute_statement("db1", "CREATE TABLE t(id INTEGER)", &[], None)
            .await
            .unwrap();
        let tx_id = core.transaction_begin("db1", false).await.unwrap();
        core.transaction_execute(&tx_id, "INSERT INTO t(id) VALUES (1)", &[])
            .await
            .unwrap();
        core.transaction_commit(&tx_id).await.unwrap();

        let text = core
            .execute_query("db1", "SELECT COUNT(*) AS c FROM t", &[], None)
            .await
            .unwrap();
        assert!(text.contains("1"));
    }

    #[tokio::test]
    async fn schema_introspect_tables_lists_created_table() {
        let core = core("db1");
        core.execute_statement("db1", "CREATE TABLE widgets(id INTEGER)", &[], None)
            .await
            .unwrap();
        let value = core
            .schema_introspect("db1", SchemaComponent::Tables, None)
            .await
            .unwrap();
        assert_eq!(value["tables"], serde_json::json!(["widgets"]));
    }

    #[tokio::test]
    async fn schema_introspect_columns_requires_table() {
        let core = core("db1");
        let err = core
            .schema_introspect("db1", SchemaComponent::Columns, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ParameterError(_)));
    }

    #[tokio::test]
    async fn get_database_type_does_not_open_pool() {
        let core = core("db1");
        assert_eq!(core.get_database_type("db1").unwrap(), D::Sqlite);
        assert_eq!(core.manager().stats().open_count, 0);
    }

    #[tokio::test]
    async fn performance_reset_and_get_metrics_roundtrip() {
        let core = core("db1");
        core.execute_query("db1", "SELECT 1", &[], None)
            .await
            .unwrap();
        let metrics = core
            .performance("db1", PerformanceAction::GetMetrics, None, None)
            .await
            .unwrap();
        assert_eq!(metrics["sampleCount"], serde_json::json!(1));

        core.performance("db1", PerformanceAction::Reset, None, None)
            .await
            .unwrap();
        let metrics_after = core
            .performance("db1", PerformanceAction::GetMetrics, None, None)
            .await
            .unwrap();
        assert_eq!(metrics_after["sampleCount"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn performance_analyze_query_rejects_non_select() {
        let core = core("db1");
        let err = core
            .performance(
                "db1",
                PerformanceAction::AnalyzeQuery,
                Some("DELETE FROM t"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ParameterError(_)));
    }
}
