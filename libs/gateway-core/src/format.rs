//! Text rendering for the use-case layer's results (spec §4.6). The
//! dispatcher (`gateway-rpc`) wraps these strings verbatim in the content
//! envelope — formatting lives here so it is exercised independently of any
//! transport.

use gateway_db::{ExecResult, QueryRows};

/// `header + rows + "Total rows: N"` (spec §4.6/§8 scenario S2).
pub fn render_query_rows(rows: &QueryRows) -> String {
    let mut out = String::new();
    out.push_str(&rows.columns.join("\t"));
    out.push('\n');
    for row in &rows.rows {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out.push_str(&format!("\nTotal rows: {}", rows.rows.len()));
    out
}

/// `Rows affected: X\nLast insert ID: Y` (spec §4.6).
pub fn render_exec_result(result: &ExecResult) -> String {
    format!(
        "Rows affected: {}\nLast insert ID: {}",
        result.rows_affected, result.last_insert_id
    )
}

/// Renders whichever side of the query/exec union a transaction `execute`
/// produced (spec §4.4's `Execute(id, statement, params)`).
pub fn render_tx_execute(result: &Result<QueryRows, ExecResult>) -> String {
    match result {
        Ok(rows) => render_query_rows(rows),
        Err(exec) => render_exec_result(exec),
    }
}

/// `Available databases:\n\n` followed by a numbered list, or the literal
/// empty-config sentence (spec §8 scenario S1).
pub fn render_list_databases(ids: &[String]) -> String {
    let mut out = String::from("Available databases:\n\n");
    if ids.is_empty() {
        out.push_str("No databases configured.\n");
    } else {
        for (i, id) in ids.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, id));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_db::ColumnValue;

    #[test]
    fn renders_header_rows_and_total() {
        let rows = QueryRows {
            columns: vec!["n".to_string()],
            rows: vec![vec![ColumnValue::Int(1)]],
        };
        let text = render_query_rows(&rows);
        assert_eq!(text, "n\n1\n\nTotal rows: 1");
    }

    #[test]
    fn renders_exec_result_with_negative_one_when_unknown() {
        let result = ExecResult {
            rows_affected: 3,
            last_insert_id: -1,
        };
        assert_eq!(
            render_exec_result(&result),
            "Rows affected: 3\nLast insert ID: -1"
        );
    }

    #[test]
    fn renders_empty_database_list_with_literal_sentence() {
        assert_eq!(
            render_list_databases(&[]),
            "Available databases:\n\nNo databases configured.\n"
        );
    }

    #[test]
    fn renders_numbered_database_list() {
        assert_eq!(
            render_list_databases(&["mysql1".to_string(), "pg1".to_string()]),
            "Available databases:\n\n1. mysql1\n2. pg1\n"
        );
    }
}
