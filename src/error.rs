use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlGenError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("No SQL query generated")]
    NoSqlGenerated,

    #[error("SQL execution failed: {message} [SQL: {sql}]")]
    SqlExecution { sql: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlGenError {
    /// The SQL statement that was generated before the failure, when the
    /// error occurred while executing it.
    pub fn generated_sql(&self) -> Option<&str> {
        match self {
            SqlGenError::SqlExecution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlGenError>;
