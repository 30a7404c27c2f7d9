//! C5 Dialect Strategies: ordered, fallback-capable catalog-query sets for
//! schema introspection across MySQL, PostgreSQL, SQLite, and Oracle
//! (spec §4.5).
//!
//! Grounded in `modkit_db`'s per-dialect SQL string constants, generalized
//! from "one query per dialect" to "ordered candidate list per dialect
//! with first-success-wins fallback", since no single catalog query is
//! portable across every vendor/version combination the gateway targets.

mod strategy;

pub mod introspect;

pub use introspect::{
    columns, filter_table_names, full_schema, placeholder_style, relationships, tables,
    ColumnInfo, FullSchema, RelationshipInfo,
};

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::{ConnectionSpec, Dialect};
    use gateway_db::DbHandle;
    use std::collections::HashMap;

    fn sqlite_spec() -> ConnectionSpec {
        ConnectionSpec {
            id: "schema-test".into(),
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
    async fn tables_and_columns_reflect_ddl() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        gateway_db::execute_statement(
            &handle,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )
        .await
        .unwrap();

        let names = tables(&handle, "schema-test").await.unwrap();
        assert_eq!(names, vec!["users"]);

        let cols = columns(&handle, "schema-test", "users").await.unwrap();
        let col_names: Vec<&str> = cols.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(col_names, vec!["id", "name"]);
        assert_eq!(cols[1].is_nullable, "NO");
    }

    #[tokio::test]
    async fn relationships_discovered_via_foreign_key_list() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        gateway_db::execute_statement(&handle, "CREATE TABLE parent(id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        gateway_db::execute_statement(
            &handle,
            "CREATE TABLE child(id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id))",
            &[],
        )
        .await
        .unwrap();

        let rels = relationships(&handle, "schema-test", Some("child")).await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].foreign_table_name, "parent");
        assert_eq!(rels[0].column_name, "parent_id");
    }

    #[tokio::test]
    async fn full_schema_assembles_tables_columns_and_relationships() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        gateway_db::execute_statement(&handle, "CREATE TABLE a(id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        gateway_db::execute_statement(
            &handle,
            "CREATE TABLE b(id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id))",
            &[],
        )
        .await
        .unwrap();

        let schema = full_schema(&handle, "schema-test").await.unwrap();
        assert_eq!(schema.tables, vec!["a", "b"]);
        assert_eq!(schema.schema.len(), 2);
        assert_eq!(schema.relationships.len(), 1);
    }

    #[tokio::test]
    async fn filter_table_names_is_case_insensitive_and_sorted() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        for t in ["wp_users", "wp_posts", "users", "WP_Options"] {
            gateway_db::execute_statement(
                &handle,
                &format!("CREATE TABLE {t}(id INTEGER PRIMARY KEY)"),
                &[],
            )
            .await
            .unwrap();
        }

        let matches = filter_table_names(&handle, "schema-test", "WP_").await.unwrap();
        assert_eq!(matches, vec!["WP_Options", "wp_posts", "wp_users"]);
    }

    #[tokio::test]
    async fn empty_pattern_is_parameter_error() {
        let handle = DbHandle::connect(&sqlite_spec()).await.unwrap();
        let err = filter_table_names(&handle, "schema-test", "")
            .await
            .unwrap_err();
        assert!(matches!(err, gateway_errors::GatewayError::ParameterError(_)));
    }

    #[test]
    fn placeholder_styles_match_dialect_grammar() {
        assert_eq!(placeholder_style(Dialect::Postgres), "$1");
        assert_eq!(placeholder_style(Dialect::Mysql), "?");
        assert_eq!(placeholder_style(Dialect::Sqlite), "?");
        assert_eq!(placeholder_style(Dialect::Oracle), ":1");
    }
}
