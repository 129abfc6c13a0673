//! Single-question SQL generation.
//!
//! Runs the full retrieve-generate-execute pipeline for one question and
//! normalizes the resulting statement onto a single line. When the pipeline
//! fails after a statement was generated, the statement is recovered from
//! the error instead of losing the prediction.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SqlGenError};
use crate::index::IndexBundle;

lazy_static! {
    static ref NEWLINES: Regex = Regex::new(r"\n+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SQL_IN_ERROR: Regex = Regex::new(r"(?s)\[SQL: (.*?)\]").unwrap();
}

/// Generates one SQL prediction for `question` against the bundle's
/// database. The returned statement is always a single trimmed line.
pub async fn generate_sql(bundle: &IndexBundle, question: &str) -> Result<String> {
    let query = match query_index(bundle, question).await {
        Ok(sql) => sql,
        Err(err) => match salvage_sql(&err) {
            Some(sql) => sql,
            None => return Err(err),
        },
    };
    Ok(normalize_sql(&query))
}

async fn query_index(bundle: &IndexBundle, question: &str) -> Result<String> {
    let context = bundle
        .context_builder
        .query_index_for_context(&bundle.schema_index, question)
        .await?;
    let container = bundle.context_builder.build_context_container(context);
    let response = bundle.struct_index.query(question, &container).await?;
    response.sql_query.ok_or(SqlGenError::NoSqlGenerated)
}

/// Recovers the generated statement from a failed pipeline run. Execution
/// errors carry it directly; for anything else, fall back to scraping the
/// `[SQL: ...]` marker some layers embed in their messages.
fn salvage_sql(err: &SqlGenError) -> Option<String> {
    if let Some(sql) = err.generated_sql() {
        return Some(sql.to_string());
    }
    extract_sql_from_error(&err.to_string())
}

/// Pulls a statement out of an error message containing `[SQL: ...]`.
pub fn extract_sql_from_error(message: &str) -> Option<String> {
    SQL_IN_ERROR
        .captures(message)
        .map(|captures| captures[1].to_string())
}

/// Collapses newlines and runs of whitespace to single spaces and trims,
/// so every prediction fits on one output line.
pub fn normalize_sql(query: &str) -> String {
    let collapsed = NEWLINES.replace_all(query, " ");
    let collapsed = WHITESPACE.replace_all(collapsed.as_ref(), " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_onto_one_line() {
        assert_eq!(
            normalize_sql("SELECT *\nFROM singer\n\nWHERE age > 20"),
            "SELECT * FROM singer WHERE age > 20"
        );
        assert_eq!(normalize_sql("SELECT *\n\nFROM   t\n"), "SELECT * FROM t");
        assert_eq!(normalize_sql("  SELECT\t1  "), "SELECT 1");
        assert_eq!(normalize_sql("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn extracts_sql_from_error_message() {
        let message = "Execution failed: no such table: t\n[SQL: SELECT * FROM t]\n(details)";
        assert_eq!(
            extract_sql_from_error(message).as_deref(),
            Some("SELECT * FROM t")
        );
    }

    #[test]
    fn extraction_spans_newlines_and_stops_at_first_bracket() {
        let message = "boom [SQL: SELECT *\nFROM singer] trailing [SQL: SELECT 2]";
        assert_eq!(
            extract_sql_from_error(message).as_deref(),
            Some("SELECT *\nFROM singer")
        );
    }

    #[test]
    fn no_marker_means_no_salvage() {
        assert_eq!(extract_sql_from_error("plain failure"), None);
        assert_eq!(salvage_sql(&SqlGenError::Llm("timeout".to_string())), None);
        assert_eq!(salvage_sql(&SqlGenError::NoSqlGenerated), None);
    }

    #[test]
    fn execution_errors_salvage_the_exact_statement() {
        // The typed field wins over message scraping, so a statement
        // containing a bracket survives intact.
        let err = SqlGenError::SqlExecution {
            sql: "SELECT name FROM t WHERE tag = '[x]'".to_string(),
            message: "no such table: t".to_string(),
        };
        assert_eq!(
            salvage_sql(&err).as_deref(),
            Some("SELECT name FROM t WHERE tag = '[x]'")
        );
    }

    #[test]
    fn salvages_marker_from_other_error_channels() {
        let err = SqlGenError::Llm("backend failed\n[SQL: SELECT 1]".to_string());
        assert_eq!(salvage_sql(&err).as_deref(), Some("SELECT 1"));
    }
}
