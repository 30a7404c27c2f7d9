//! Per-dialect ordered catalog-query candidates (spec §4.5).
//!
//! Each candidate is tried in order; the first one that executes without a
//! driver error wins, even if it returns zero rows (spec §9: "must not
//! treat an empty result set as failure").

use gateway_config::Dialect;

/// One candidate catalog query. `table_binds` says how many times the
/// caller's single `table` argument must be repeated when binding
/// parameters — dialects differ in how many placeholders a query needs for
/// the same logical value (e.g. SQLite's `pragma_table_info` candidate
/// both labels the output with the table name *and* passes it to the
/// table-valued function).
pub struct CandidateQuery {
    pub sql: &'static str,
    pub table_binds: usize,
}

const fn q(sql: &'static str, table_binds: usize) -> CandidateQuery {
    CandidateQuery { sql, table_binds }
}

pub struct DialectStrategy {
    pub tables: &'static [CandidateQuery],
    pub columns: &'static [CandidateQuery],
    /// Relationships filtered to one table.
    pub relationships_for_table: &'static [CandidateQuery],
    /// Relationships across the whole schema (no table filter).
    pub relationships_all: &'static [CandidateQuery],
}

pub fn for_dialect(dialect: Dialect) -> &'static DialectStrategy {
    match dialect {
        Dialect::Postgres => &POSTGRES,
        Dialect::Mysql => &MYSQL,
        Dialect::Sqlite => &SQLITE,
        Dialect::Oracle => &ORACLE,
    }
}

static POSTGRES: DialectStrategy = DialectStrategy {
    tables: &[
        q(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
            0,
        ),
        q(
            "SELECT tablename AS table_name FROM pg_catalog.pg_tables \
             WHERE schemaname = 'public' ORDER BY tablename",
            0,
        ),
    ],
    columns: &[
        q(
            "SELECT $1 AS table_name, column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position",
            1,
        ),
        q(
            "SELECT c.relname AS table_name, a.attname AS column_name, \
             pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type, \
             CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END AS is_nullable, \
             NULL AS column_default \
             FROM pg_catalog.pg_attribute a JOIN pg_catalog.pg_class c ON a.attrelid = c.oid \
             WHERE c.relname = $1 AND a.attnum > 0 ORDER BY a.attnum",
            1,
        ),
    ],
    relationships_for_table: &[q(
        "SELECT tc.table_schema, tc.constraint_name, tc.table_name, kcu.column_name, \
         ccu.table_schema AS foreign_table_schema, ccu.table_name AS foreign_table_name, \
         ccu.column_name AS foreign_column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
           ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_name = $1",
        1,
    )],
    relationships_all: &[q(
        "SELECT tc.table_schema, tc.constraint_name, tc.table_name, kcu.column_name, \
         ccu.table_schema AS foreign_table_schema, ccu.table_name AS foreign_table_name, \
         ccu.column_name AS foreign_column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
           ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY'",
        0,
    )],
};

static MYSQL: DialectStrategy = DialectStrategy {
    tables: &[q(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = DATABASE() ORDER BY table_name",
        0,
    )],
    columns: &[q(
        "SELECT table_name, column_name, data_type, is_nullable, column_default \
         FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = ? ORDER BY ordinal_position",
        1,
    )],
    relationships_for_table: &[q(
        "SELECT table_schema, constraint_name, table_name, column_name, \
         table_schema AS foreign_table_schema, referenced_table_name AS foreign_table_name, \
         referenced_column_name AS foreign_column_name \
         FROM information_schema.key_column_usage \
         WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL AND table_name = ?",
        1,
    )],
    relationships_all: &[q(
        "SELECT table_schema, constraint_name, table_name, column_name, \
         table_schema AS foreign_table_schema, referenced_table_name AS foreign_table_name, \
         referenced_column_name AS foreign_column_name \
         FROM information_schema.key_column_usage \
         WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL",
        0,
    )],
};

static SQLITE: DialectStrategy = DialectStrategy {
    tables: &[q(
        "SELECT name AS table_name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        0,
    )],
    columns: &[q(
        "SELECT ? AS table_name, name AS column_name, type AS data_type, \
         CASE WHEN \"notnull\" THEN 'NO' ELSE 'YES' END AS is_nullable, \
         dflt_value AS column_default \
         FROM pragma_table_info(?)",
        2,
    )],
    relationships_for_table: &[q(
        "SELECT 'main' AS table_schema, 'fk_' || id AS constraint_name, ? AS table_name, \
         \"from\" AS column_name, 'main' AS foreign_table_schema, \"table\" AS foreign_table_name, \
         \"to\" AS foreign_column_name \
         FROM pragma_foreign_key_list(?)",
        2,
    )],
    // SQLite has no single catalog view for all foreign keys; the
    // schema-wide path iterates tables in `introspect::relationships` and
    // runs this per-table candidate for each one.
    relationships_all: &[],
};

static ORACLE: DialectStrategy = DialectStrategy {
    tables: &[
        q("SELECT table_name FROM user_tables ORDER BY table_name", 0),
        q(
            "SELECT table_name FROM all_tables WHERE owner = USER ORDER BY table_name",
            0,
        ),
    ],
    columns: &[
        q(
            "SELECT table_name, column_name, data_type, nullable AS is_nullable, \
             data_default AS column_default \
             FROM user_tab_columns WHERE table_name = :1 ORDER BY column_id",
            1,
        ),
        q(
            "SELECT table_name, column_name, data_type, nullable AS is_nullable, \
             data_default AS column_default \
             FROM all_tab_columns WHERE table_name = :1 AND owner = USER ORDER BY column_id",
            1,
        ),
    ],
    relationships_for_table: &[q(
        "SELECT a.owner AS table_schema, a.constraint_name, a.table_name, a.column_name, \
         c_pk.owner AS foreign_table_schema, c_pk.table_name AS foreign_table_name, \
         b.column_name AS foreign_column_name \
         FROM user_cons_columns a \
         JOIN user_constraints c ON a.constraint_name = c.constraint_name \
         JOIN user_constraints c_pk ON c.r_constraint_name = c_pk.constraint_name \
         JOIN user_cons_columns b \
           ON c_pk.constraint_name = b.constraint_name AND a.position = b.position \
         WHERE c.constraint_type = 'R' AND a.table_name = :1",
        1,
    )],
    relationships_all: &[q(
        "SELECT a.owner AS table_schema, a.constraint_name, a.table_name, a.column_name, \
         c_pk.owner AS foreign_table_schema, c_pk.table_name AS foreign_table_name, \
         b.column_name AS foreign_column_name \
         FROM user_cons_columns a \
         JOIN user_constraints c ON a.constraint_name = c.constraint_name \
         JOIN user_constraints c_pk ON c.r_constraint_name = c_pk.constraint_name \
         JOIN user_cons_columns b \
           ON c_pk.constraint_name = b.constraint_name AND a.position = b.position \
         WHERE c.constraint_type = 'R'",
        0,
    )],
};
