//! Structured text-to-SQL index.
//!
//! Turns a question plus retrieved schema context into a SQL statement,
//! runs it against the database, and returns both the rendered rows and the
//! statement itself. Execution failures keep the generated statement
//! attached so callers can still recover it.

use std::sync::Arc;

use crate::db::SqlDatabase;
use crate::error::{Result, SqlGenError};
use crate::index::context::SqlContextContainer;
use crate::llm::CompletionModel;

/// Response from a structured query: the rendered result rows and the SQL
/// that produced them.
#[derive(Debug, Clone)]
pub struct SqlResponse {
    pub text: String,
    pub sql_query: Option<String>,
}

pub struct TextToSqlIndex {
    database: Arc<SqlDatabase>,
    model: Arc<dyn CompletionModel>,
}

impl TextToSqlIndex {
    pub fn new(database: Arc<SqlDatabase>, model: Arc<dyn CompletionModel>) -> Self {
        Self { database, model }
    }

    /// Generates SQL for the question and executes it. An execution failure
    /// is returned as [`SqlGenError::SqlExecution`] carrying the statement.
    pub async fn query(
        &self,
        question: &str,
        context: &SqlContextContainer,
    ) -> Result<SqlResponse> {
        let prompt = text_to_sql_prompt(question, context);
        let completion = self.model.complete(&prompt).await?;
        let sql = parse_sql_completion(&completion);
        if sql.is_empty() {
            return Err(SqlGenError::NoSqlGenerated);
        }

        let rows = self
            .database
            .run_sql(&sql)
            .map_err(|e| SqlGenError::SqlExecution {
                sql: sql.clone(),
                message: e.to_string(),
            })?;

        Ok(SqlResponse {
            text: render_rows(&rows),
            sql_query: Some(sql),
        })
    }
}

fn text_to_sql_prompt(question: &str, context: &SqlContextContainer) -> String {
    format!(
        r#"Given an input question, create a syntactically correct sqlite query to run.
Pay attention to use only the column names that you can see in the schema description below. Be careful to not query for columns that do not exist. Pay attention to which column is in which table. Qualify column names with the table name when needed.

Use the following format:
Question: Question here
SQLQuery: SQL query to run
SQLResult: Result of the SQL query
Answer: Final answer here

Only use the tables listed below.
{}

Question: {}
SQLQuery: "#,
        context.context_str, question
    )
}

/// Cuts the SQL statement out of a model completion. Models echo the
/// few-shot format back, wrap statements in markdown fences, or continue
/// past the query into `SQLResult:`.
fn parse_sql_completion(completion: &str) -> String {
    let mut sql = completion.trim();
    if let Some(rest) = sql.strip_prefix("```sql") {
        sql = rest;
    } else if let Some(rest) = sql.strip_prefix("```") {
        sql = rest;
    }
    if let Some(rest) = sql.strip_suffix("```") {
        sql = rest;
    }
    sql = sql.trim();
    if let Some(rest) = sql.strip_prefix("SQLQuery:") {
        sql = rest;
    }
    if let Some(idx) = sql.find("SQLResult:") {
        sql = &sql[..idx];
    }
    sql.trim().to_string()
}

fn render_rows(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| format!("({})", row.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_context_and_question() {
        let container = SqlContextContainer {
            context_str: "Table 'singer' has columns: singer_id (INTEGER).".to_string(),
        };
        let prompt = text_to_sql_prompt("How many singers do we have?", &container);
        assert!(prompt.contains("Table 'singer' has columns: singer_id (INTEGER)."));
        assert!(prompt.contains("Question: How many singers do we have?"));
        assert!(prompt.ends_with("SQLQuery: "));
    }

    #[test]
    fn parses_bare_statement() {
        assert_eq!(
            parse_sql_completion("SELECT count(*) FROM singer\n"),
            "SELECT count(*) FROM singer"
        );
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(
            parse_sql_completion("```sql\nSELECT name FROM singer\n```"),
            "SELECT name FROM singer"
        );
        assert_eq!(
            parse_sql_completion("```\nSELECT name FROM singer\n```"),
            "SELECT name FROM singer"
        );
    }

    #[test]
    fn drops_echoed_format_labels() {
        assert_eq!(
            parse_sql_completion(
                "SQLQuery: SELECT count(*) FROM singer\nSQLResult: (5)\nAnswer: There are 5 singers."
            ),
            "SELECT count(*) FROM singer"
        );
    }

    #[test]
    fn renders_rows_as_tuples() {
        let rows = vec![
            vec!["1".to_string(), "Joe".to_string()],
            vec!["2".to_string(), "Ann".to_string()],
        ];
        assert_eq!(render_rows(&rows), "(1, Joe)\n(2, Ann)");
    }
}
