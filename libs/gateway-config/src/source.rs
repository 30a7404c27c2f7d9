//! Layered connection-list loading (spec §4.1, §6).
//!
//! Sources, in precedence order: (a) explicit file path, (b) inline JSON
//! literal, (c) the `DB_CONFIG` environment variable, (d) legacy
//! single-connection environment variables. The first source that yields a
//! *non-empty* connection list wins — a source producing zero connections
//! is treated the same as an absent source, not an error; only exhausting
//! every source is a `ConfigError` (spec §4.1: "A missing source is not an
//! error; exhausting all sources is.").
//!
//! This is a deliberate departure from the teacher's `figment`-based deep
//! merge (`runtime::config::load_layered`): the spec's precedence rule is
//! "first non-empty source wins", not "merge every layer", so the loader is
//! a plain explicit chain over `serde_json` rather than a `Figment` profile
//! stack (see SPEC_FULL.md §2).

use crate::dialect::Dialect;
use crate::spec::{ConfigFile, ConnectionSpec};
use gateway_errors::GatewayError;
use std::path::Path;

const ENV_DB_CONFIG: &str = "DB_CONFIG";
const ENV_LEGACY_TYPE: &str = "DB_TYPE";
const ENV_LEGACY_HOST: &str = "DB_HOST";
const ENV_LEGACY_PORT: &str = "DB_PORT";
const ENV_LEGACY_USER: &str = "DB_USER";
const ENV_LEGACY_PASSWORD: &str = "DB_PASSWORD";
const ENV_LEGACY_NAME: &str = "DB_NAME";

/// Everything the CLI can pass in before environment variables are
/// consulted.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    pub file_path: Option<std::path::PathBuf>,
    pub inline_json: Option<String>,
}

fn parse_json_connections(json: &str) -> Result<Vec<ConnectionSpec>, GatewayError> {
    let file: ConfigFile = serde_json::from_str(json)
        .map_err(|e| GatewayError::ConfigError(format!("invalid connection JSON: {e}")))?;
    Ok(file.connections)
}

fn from_file(path: &Path) -> Result<Vec<ConnectionSpec>, GatewayError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::ConfigError(format!("cannot read config file '{}': {e}", path.display()))
    })?;
    parse_json_connections(&text)
}

fn from_legacy_env() -> Option<ConnectionSpec> {
    let dialect = std::env::var(ENV_LEGACY_TYPE)
        .ok()
        .and_then(|s| Dialect::parse(&s))?;

    Some(ConnectionSpec {
        id: "default".to_string(),
        dialect,
        host: std::env::var(ENV_LEGACY_HOST).ok(),
        port: std::env::var(ENV_LEGACY_PORT)
            .ok()
            .and_then(|s| s.parse().ok()),
        user: std::env::var(ENV_LEGACY_USER).ok(),
        password: std::env::var(ENV_LEGACY_PASSWORD).ok(),
        name: std::env::var(ENV_LEGACY_NAME).ok(),
        ssl_mode: None,
        ssl_cert: None,
        ssl_key: None,
        ssl_root_cert: None,
        application_name: None,
        target_session_attrs: None,
        options: Default::default(),
        service_name: None,
        sid: None,
        wallet_dir: None,
        tns_admin: None,
        tns_alias: None,
        edition: None,
        pooling: None,
        standby: None,
        nls_lang: None,
        file: None,
        cipher_key: None,
        read_only: None,
        cache_size: None,
        journal_mode: None,
        driver_variant: None,
        max_open: None,
        max_idle: None,
        max_lifetime_secs: None,
        max_idle_time_secs: None,
        connect_timeout_secs: None,
        query_timeout_secs: None,
    })
}

/// Resolve the connection list by walking the precedence chain, then
/// validate and normalize every entry.
pub fn load_connections(sources: &ConfigSources) -> Result<Vec<ConnectionSpec>, GatewayError> {
    let mut connections: Vec<ConnectionSpec> = Vec::new();

    if let Some(path) = &sources.file_path {
        let parsed = from_file(path)?;
        if !parsed.is_empty() {
            connections = parsed;
        }
    }

    if connections.is_empty() {
        if let Some(json) = &sources.inline_json {
            let parsed = parse_json_connections(json)?;
            if !parsed.is_empty() {
                connections = parsed;
            }
        }
    }

    if connections.is_empty() {
        if let Ok(json) = std::env::var(ENV_DB_CONFIG) {
            let parsed = parse_json_connections(&json)?;
            if !parsed.is_empty() {
                connections = parsed;
            }
        }
    }

    if connections.is_empty() {
        if let Some(legacy) = from_legacy_env() {
            connections = vec![legacy];
        }
    }

    if connections.is_empty() {
        return Err(GatewayError::ConfigError(
            "no connections configured: exhausted file, inline, DB_CONFIG, and legacy DB_* sources"
                .into(),
        ));
    }

    crate::spec::validate_all(&mut connections)?;
    Ok(connections)
}

/// Tool-name prefix drawn from `MCP_SERVER_NAME`, defaulting to a fixed
/// token when unset (spec §4.7).
pub fn server_name() -> String {
    std::env::var("MCP_SERVER_NAME").unwrap_or_else(|_| "db".to_string())
}

/// `sse` or `stdio`, from `TRANSPORT_MODE`, overridden by the CLI flag
/// (spec §6).
pub fn transport_mode_from_env() -> Option<String> {
    std::env::var("TRANSPORT_MODE").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for k in [
            ENV_DB_CONFIG,
            ENV_LEGACY_TYPE,
            ENV_LEGACY_HOST,
            ENV_LEGACY_PORT,
            ENV_LEGACY_USER,
            ENV_LEGACY_PASSWORD,
            ENV_LEGACY_NAME,
        ] {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn file_wins_over_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.json");
        std::fs::write(
            &path,
            r#"{"connections":[{"id":"a","type":"sqlite","file":":memory:"}]}"#,
        )
        .unwrap();
        std::env::set_var(ENV_DB_CONFIG, r#"{"connections":[{"id":"b","type":"sqlite","file":":memory:"}]}"#);

        let sources = ConfigSources {
            file_path: Some(path),
            inline_json: None,
        };
        let conns = load_connections(&sources).unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].id, "a");
        clear_env();
    }

    #[test]
    fn empty_file_falls_through_to_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.json");
        std::fs::write(&path, r#"{"connections":[]}"#).unwrap();
        std::env::set_var(
            ENV_DB_CONFIG,
            r#"{"connections":[{"id":"b","type":"sqlite","file":":memory:"}]}"#,
        );

        let sources = ConfigSources {
            file_path: Some(path),
            inline_json: None,
        };
        let conns = load_connections(&sources).unwrap();
        assert_eq!(conns[0].id, "b");
        clear_env();
    }

    #[test]
    fn legacy_env_produces_default_id() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_LEGACY_TYPE, "postgres");
        std::env::set_var(ENV_LEGACY_HOST, "localhost");
        std::env::set_var(ENV_LEGACY_NAME, "appdb");

        let sources = ConfigSources::default();
        let conns = load_connections(&sources).unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].id, "default");
        assert_eq!(conns[0].dialect, Dialect::Postgres);
        clear_env();
    }

    #[test]
    fn no_sources_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let sources = ConfigSources::default();
        assert!(load_connections(&sources).is_err());
    }
}
