//! C7 Tool Factory: synthesizes the fixed per-database tool catalog plus
//! the global `list_databases` descriptor (spec §4.7).
//!
//! Tool names are stable for a given config + server name: `mcp_<serverName>_
//! <toolKind>_<dbID>`. When no databases are configured, a `mock` descriptor
//! is installed per kind instead (spec §4.7), so the RPC surface always has
//! something to answer with.

use serde_json::{json, Value};

/// The abstract operation classes a per-database tool catalog carries
/// (spec §4.7/glossary). `ListDatabases` is global, not per-database, and
/// is synthesized separately by [`build_catalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Query,
    Execute,
    Transaction,
    Schema,
    Performance,
    FilterTableNames,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Query,
        ToolKind::Execute,
        ToolKind::Transaction,
        ToolKind::Schema,
        ToolKind::Performance,
        ToolKind::FilterTableNames,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Query => "query",
            ToolKind::Execute => "execute",
            ToolKind::Transaction => "transaction",
            ToolKind::Schema => "schema",
            ToolKind::Performance => "performance",
            ToolKind::FilterTableNames => "filter_table_names",
        }
    }

    fn description(&self, db_id: &str) -> String {
        match self {
            ToolKind::Query => format!("Run a read-only SQL query against database '{db_id}'"),
            ToolKind::Execute => {
                format!("Run a SQL statement with side effects against database '{db_id}'")
            }
            ToolKind::Transaction => {
                format!("Begin, execute within, commit, or roll back a transaction on '{db_id}'")
            }
            ToolKind::Schema => format!("Introspect the schema of database '{db_id}'"),
            ToolKind::Performance => {
                format!("Inspect or reset query performance metrics for '{db_id}'")
            }
            ToolKind::FilterTableNames => {
                format!("List table names in '{db_id}' matching a substring pattern")
            }
        }
    }

    /// JSON schema for the tool's arguments (spec §6).
    fn argument_schema(&self) -> Value {
        match self {
            ToolKind::Query => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "params": {"type": "array"},
                    "timeout": {"type": "integer"},
                },
                "required": ["query"],
            }),
            ToolKind::Execute => json!({
                "type": "object",
                "properties": {
                    "statement": {"type": "string"},
                    "params": {"type": "array"},
                    "timeout": {"type": "integer"},
                },
                "required": ["statement"],
            }),
            ToolKind::Transaction => json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["begin", "commit", "rollback", "execute"]},
                    "transactionId": {"type": "string"},
                    "statement": {"type": "string"},
                    "params": {"type": "array"},
                    "readOnly": {"type": "boolean"},
                    "timeout": {"type": "integer"},
                },
                "required": ["action"],
            }),
            ToolKind::Schema => json!({
                "type": "object",
                "properties": {
                    "component": {"type": "string", "enum": ["tables", "columns", "relationships", "full"]},
                    "table": {"type": "string"},
                    "timeout": {"type": "integer"},
                },
                "required": [],
            }),
            ToolKind::Performance => json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["getSlowQueries", "getMetrics", "analyzeQuery", "reset", "setThreshold"]},
                    "query": {"type": "string"},
                    "threshold": {"type": "number"},
                    "limit": {"type": "number"},
                },
                "required": ["action"],
            }),
            ToolKind::FilterTableNames => json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string"},
                },
                "required": ["pattern"],
            }),
        }
    }
}

/// Name/schema/description/handler-binding for one RPC-addressable tool
/// (spec §3's `ToolDescriptor`).
#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub name: String,
    pub kind: ToolKind,
    /// The database this tool targets, or `None` for `list_databases` and
    /// mock descriptors (spec §4.7: installed when no database is
    /// configured).
    pub db_id: Option<String>,
    pub description: String,
    pub schema: Value,
    pub is_mock: bool,
}

fn synthesize_name(server_name: &str, kind: ToolKind, db_id: &str) -> String {
    format!("mcp_{server_name}_{}_{db_id}", kind.as_str())
}

pub fn list_databases_tool_name(server_name: &str) -> String {
    format!("mcp_{server_name}_list_databases")
}

fn per_database_descriptor(server_name: &str, kind: ToolKind, db_id: &str, is_mock: bool) -> ToolDescriptor {
    ToolDescriptor {
        name: synthesize_name(server_name, kind, db_id),
        kind,
        db_id: if is_mock { None } else { Some(db_id.to_string()) },
        description: kind.description(db_id),
        schema: kind.argument_schema(),
        is_mock,
    }
}

/// Materializes the full catalog: one descriptor per `(database, kind)`
/// pair plus `list_databases`; a `mock` catalog when `db_ids` is empty
/// (spec §4.7).
pub fn build_catalog(server_name: &str, db_ids: &[String]) -> Vec<ToolDescriptor> {
    let mut descriptors = Vec::new();

    if db_ids.is_empty() {
        for kind in ToolKind::ALL {
            descriptors.push(per_database_descriptor(server_name, kind, "mock", true));
        }
    } else {
        for db_id in db_ids {
            for kind in ToolKind::ALL {
                descriptors.push(per_database_descriptor(server_name, kind, db_id, false));
            }
        }
    }

    descriptors.push(ToolDescriptor {
        name: list_databases_tool_name(server_name),
        kind: ToolKind::Query, // unused for list_databases; dispatcher special-cases the name
        db_id: None,
        description: "List every configured database ID".to_string(),
        schema: json!({"type": "object", "properties": {}, "required": []}),
        is_mock: false,
    });

    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_names_per_spec_grammar() {
        let catalog = build_catalog("db", &["mysql1".to_string()]);
        let names: Vec<&str> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"mcp_db_query_mysql1"));
        assert!(names.contains(&"mcp_db_transaction_mysql1"));
        assert!(names.contains(&"mcp_db_list_databases"));
    }

    #[test]
    fn empty_config_installs_mock_catalog() {
        let catalog = build_catalog("db", &[]);
        assert!(catalog.iter().any(|d| d.name == "mcp_db_query_mock" && d.is_mock));
        // list_databases is still installed even with no databases.
        assert!(catalog.iter().any(|d| d.name == "mcp_db_list_databases"));
    }
}
