use crate::dialect::Dialect;
use crate::numeric::{opt_u32, opt_u64};
use gateway_errors::GatewayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SSL mode for Postgres connections (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Require,
    VerifyCa,
    VerifyFull,
    Prefer,
}

/// SQLite journal mode (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Wal,
    Off,
}

/// Declarative, per-database connection record (spec §3). Fields are kept
/// flat with dialect-specific knobs as `Option`, mirroring
/// `modkit_db::config::DbConnConfig` rather than a tagged enum of per-dialect
/// sub-structs — the config file's "unknown fields are ignored" rule (spec
/// §6) reads naturally against one flat shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub dialect: Dialect,

    // mysql / postgres / oracle
    pub host: Option<String>,
    #[serde(default, deserialize_with = "opt_u32")]
    pub port: Option<u32>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// database/service name — for oracle, doubles as the fallback for
    /// `service_name` when neither `service_name` nor `sid` is set.
    pub name: Option<String>,

    // postgres
    pub ssl_mode: Option<SslMode>,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
    pub ssl_root_cert: Option<String>,
    pub application_name: Option<String>,
    pub target_session_attrs: Option<String>,
    #[serde(default)]
    pub options: HashMap<String, String>,

    // oracle
    pub service_name: Option<String>,
    pub sid: Option<String>,
    pub wallet_dir: Option<String>,
    pub tns_admin: Option<String>,
    pub tns_alias: Option<String>,
    pub edition: Option<String>,
    pub pooling: Option<bool>,
    pub standby: Option<bool>,
    pub nls_lang: Option<String>,

    // sqlite
    pub file: Option<String>,
    pub cipher_key: Option<String>,
    pub read_only: Option<bool>,
    #[serde(default, deserialize_with = "opt_u32")]
    pub cache_size: Option<u32>,
    pub journal_mode: Option<JournalMode>,
    pub driver_variant: Option<String>,

    // pool
    #[serde(default, deserialize_with = "opt_u32")]
    pub max_open: Option<u32>,
    #[serde(default, deserialize_with = "opt_u32")]
    pub max_idle: Option<u32>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub max_lifetime_secs: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub max_idle_time_secs: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64")]
    pub query_timeout_secs: Option<u64>,
}

impl ConnectionSpec {
    /// Validate and apply dialect-aware defaults in place (spec §4.1).
    /// Returns a `ConfigError` listing the first violation found.
    pub fn validate_and_normalize(&mut self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::ConfigError(
                "connection id must not be empty".into(),
            ));
        }

        match self.dialect {
            Dialect::Sqlite => {
                if self.file.is_none() && self.name.is_none() {
                    return Err(GatewayError::ConfigError(format!(
                        "connection '{}': sqlite requires either 'file' or 'name'",
                        self.id
                    )));
                }
                self.journal_mode.get_or_insert(JournalMode::Wal);
                self.cache_size.get_or_insert(2000);
            }
            Dialect::Oracle => {
                if self.service_name.is_none() && self.sid.is_none() {
                    self.service_name = self.name.clone();
                }
                self.max_open.get_or_insert(50);
                self.max_idle.get_or_insert(10);
                self.max_lifetime_secs.get_or_insert(30 * 60);
                self.nls_lang
                    .get_or_insert_with(|| crate::DEFAULT_ORACLE_NLS_LANG.to_string());
            }
            Dialect::Postgres => {
                self.ssl_mode.get_or_insert(SslMode::Disable);
            }
            Dialect::Mysql => {}
        }

        self.max_open.get_or_insert(25);
        self.max_idle.get_or_insert(5);
        self.max_lifetime_secs.get_or_insert(5 * 60);
        self.max_idle_time_secs.get_or_insert(5 * 60);
        self.connect_timeout_secs.get_or_insert(10);
        self.query_timeout_secs.get_or_insert(30);

        Ok(())
    }
}

/// Root object of the config file format: `{"connections": [...]}` (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

/// Validate and normalize every entry, rejecting duplicate IDs (spec §3:
/// "Connection identifiers are unique across the process").
pub fn validate_all(specs: &mut [ConnectionSpec]) -> Result<(), GatewayError> {
    let mut seen = std::collections::HashSet::new();
    for spec in specs.iter_mut() {
        spec.validate_and_normalize()?;
        if !seen.insert(spec.id.clone()) {
            return Err(GatewayError::ConfigError(format!(
                "duplicate connection id '{}'",
                spec.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(id: &str, dialect: Dialect) -> ConnectionSpec {
        ConnectionSpec {
            id: id.to_string(),
            dialect,
            host: None,
            port: None,
            user: None,
            password: None,
            name: Some("appdb".into()),
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
        }
    }

    #[test]
    fn empty_id_rejected() {
        let mut s = bare("", Dialect::Postgres);
        assert!(s.validate_and_normalize().is_err());
    }

    #[test]
    fn sqlite_without_file_or_name_rejected() {
        let mut s = bare("db1", Dialect::Sqlite);
        s.name = None;
        assert!(s.validate_and_normalize().is_err());
    }

    #[test]
    fn oracle_defaults_service_name_from_name() {
        let mut s = bare("ora1", Dialect::Oracle);
        s.validate_and_normalize().unwrap();
        assert_eq!(s.service_name.as_deref(), Some("appdb"));
        assert_eq!(s.max_open, Some(50));
        assert_eq!(s.nls_lang.as_deref(), Some("AMERICAN_AMERICA.AL32UTF8"));
    }

    #[test]
    fn postgres_default_pool_values() {
        let mut s = bare("pg1", Dialect::Postgres);
        s.validate_and_normalize().unwrap();
        assert_eq!(s.max_open, Some(25));
        assert_eq!(s.max_idle, Some(5));
        assert_eq!(s.ssl_mode, Some(SslMode::Disable));
        assert_eq!(s.connect_timeout_secs, Some(10));
        assert_eq!(s.query_timeout_secs, Some(30));
    }

    #[test]
    fn sqlite_defaults_journal_and_cache() {
        let mut s = bare("sq1", Dialect::Sqlite);
        s.validate_and_normalize().unwrap();
        assert_eq!(s.journal_mode, Some(JournalMode::Wal));
        assert_eq!(s.cache_size, Some(2000));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut specs = vec![bare("a", Dialect::Sqlite), bare("a", Dialect::Sqlite)];
        assert!(validate_all(&mut specs).is_err());
    }

    #[test]
    fn numeric_field_accepts_string_or_number() {
        let json = r#"{"id":"a","type":"postgres","name":"x","port":"5432","max_open":10}"#;
        let spec: ConnectionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.port, Some(5432));
        assert_eq!(spec.max_open, Some(10));
    }
}
