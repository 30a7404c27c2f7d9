//! C7 Dispatcher: routes a tool name to the `gateway-core` operation it was
//! synthesized for (spec §4.7). Argument validation and domain errors both
//! fold into the [`ContentEnvelope`]; only an unrecognized tool name is a
//! JSON-RPC-level failure (spec §7 step 1), left for the caller to map to
//! `METHOD_NOT_FOUND`.

use crate::envelope::ContentEnvelope;
use crate::tools::{self, ToolDescriptor, ToolKind};
use crate::validate::validate_arguments;
use gateway_core::{GatewayCore, PerformanceAction, SchemaComponent};
use gateway_errors::GatewayError;
use serde_json::Value;
use std::sync::Arc;

pub struct Dispatcher {
    catalog: Vec<ToolDescriptor>,
    list_databases_name: String,
    core: Arc<GatewayCore>,
}

fn get_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn get_params(args: &Value) -> Vec<Value> {
    args.get("params")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn get_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

fn get_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn required_str(args: &Value, key: &str) -> Result<String, GatewayError> {
    get_str(args, key)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::ParameterError(format!("missing required argument '{key}'")))
}

/// Deterministic stub content for the `mock` catalog installed when no
/// databases are configured (spec §4.7: "returns deterministic stub
/// content and does not touch a database" — a successful envelope, not an
/// error, the same way the performance tool's action envelope round-trips
/// without touching real metrics per spec §6).
fn mock_stub_text(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Query => "n\n1\n\nTotal rows: 1",
        ToolKind::Execute => "Rows affected: 0\nLast insert ID: -1",
        ToolKind::Transaction => "Transaction started: mock",
        ToolKind::Schema => "{\n  \"tables\": []\n}",
        ToolKind::Performance => "{\n  \"slowQueries\": []\n}",
        ToolKind::FilterTableNames => "[]",
    }
}

impl Dispatcher {
    pub fn new(server_name: &str, db_ids: &[String], core: Arc<GatewayCore>) -> Self {
        Self {
            catalog: tools::build_catalog(server_name, db_ids),
            list_databases_name: tools::list_databases_tool_name(server_name),
            core,
        }
    }

    /// The full tool catalog, for a `tools/list` style enumeration.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.catalog.iter().find(|d| d.name == name)
    }

    /// Dispatches one tool call. `Ok(None)` means the tool name is not in
    /// the catalog — the caller maps that to a JSON-RPC `METHOD_NOT_FOUND`.
    pub async fn dispatch(&self, name: &str, args: &Value) -> Option<ContentEnvelope> {
        if name == self.list_databases_name {
            let dbs = self.core.list_databases();
            return Some(ContentEnvelope::text(gateway_core::format::render_list_databases(
                &dbs,
            )));
        }

        let descriptor = self.find(name)?;

        if descriptor.is_mock {
            return Some(ContentEnvelope::text(mock_stub_text(descriptor.kind)));
        }

        if let Err(e) = validate_arguments(&descriptor.schema, args) {
            return Some(ContentEnvelope::error(e.to_envelope_text()));
        }

        let db_id = descriptor
            .db_id
            .clone()
            .expect("non-mock descriptor always carries a db_id");

        let result = self.call(descriptor.kind, &db_id, args).await;
        Some(match result {
            Ok(text) => ContentEnvelope::text(text),
            Err(e) => ContentEnvelope::error(e.to_envelope_text()),
        })
    }

    async fn call(&self, kind: ToolKind, db_id: &str, args: &Value) -> Result<String, GatewayError> {
        match kind {
            ToolKind::Query => {
                let query = required_str(args, "query")?;
                let params = get_params(args);
                let timeout = get_u64(args, "timeout");
                self.core
                    .execute_query(db_id, &query, &params, timeout)
                    .await
            }
            ToolKind::Execute => {
                let statement = required_str(args, "statement")?;
                let params = get_params(args);
                let timeout = get_u64(args, "timeout");
                self.core
                    .execute_statement(db_id, &statement, &params, timeout)
                    .await
            }
            ToolKind::Transaction => self.call_transaction(db_id, args).await,
            ToolKind::Schema => {
                let component = match get_str(args, "component") {
                    Some(s) => SchemaComponent::parse(s).ok_or_else(|| {
                        GatewayError::ParameterError(format!("unknown schema component '{s}'"))
                    })?,
                    None => SchemaComponent::Tables,
                };
                let table = get_str(args, "table");
                let value = self.core.schema_introspect(db_id, component, table).await?;
                Ok(serde_json::to_string_pretty(&value).unwrap_or_default())
            }
            ToolKind::Performance => {
                let action_str = required_str(args, "action")?;
                let action = PerformanceAction::parse(&action_str).ok_or_else(|| {
                    GatewayError::ParameterError(format!("unknown performance action '{action_str}'"))
                })?;
                let query = get_str(args, "query");
                let threshold = args.get("threshold").and_then(Value::as_f64).map(|v| v as u64);
                let value = self
                    .core
                    .performance(db_id, action, query, threshold)
                    .await?;
                Ok(serde_json::to_string_pretty(&value).unwrap_or_default())
            }
            ToolKind::FilterTableNames => {
                let pattern = required_str(args, "pattern")?;
                let names = self.core.filter_table_names(db_id, &pattern).await?;
                Ok(serde_json::to_string_pretty(&names).unwrap_or_default())
            }
        }
    }

    async fn call_transaction(&self, db_id: &str, args: &Value) -> Result<String, GatewayError> {
        let action = required_str(args, "action")?;
        match action.as_str() {
            "begin" => {
                let read_only = get_bool(args, "readOnly", false);
                let tx_id = self.core.transaction_begin(db_id, read_only).await?;
                Ok(format!("Transaction started: {tx_id}"))
            }
            "execute" => {
                let tx_id = required_str(args, "transactionId")?;
                let statement = required_str(args, "statement")?;
                let params = get_params(args);
                self.core
                    .transaction_execute(&tx_id, &statement, &params)
                    .await
            }
            "commit" => {
                let tx_id = required_str(args, "transactionId")?;
                self.core.transaction_commit(&tx_id).await
            }
            "rollback" => {
                let tx_id = required_str(args, "transactionId")?;
                self.core.transaction_rollback(&tx_id).await
            }
            other => Err(GatewayError::ParameterError(format!(
                "unknown transaction action '{other}'"
            ))),
        }
    }
}
