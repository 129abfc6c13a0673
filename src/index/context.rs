//! Schema context selection for the text-to-SQL prompt.
//!
//! The context builder snapshots every table description for one database,
//! derives the vector index used for retrieval, and packages the retrieved
//! descriptions into the container the structured index consumes.

use std::sync::Arc;

use crate::db::SqlDatabase;
use crate::error::{Result, SqlGenError};
use crate::index::embedder::EmbeddingModel;
use crate::index::schema_index::SchemaIndex;

/// How many table descriptions are retrieved into the prompt by default.
/// Spider questions rarely span more than a couple of tables.
pub const DEFAULT_CONTEXT_TOP_K: usize = 1;

/// Schema text handed to the structured index for one query.
#[derive(Debug, Clone)]
pub struct SqlContextContainer {
    pub context_str: String,
}

#[derive(Debug)]
pub struct SqlContextBuilder {
    tables: Vec<(String, String)>,
    top_k: usize,
}

impl SqlContextBuilder {
    /// Snapshots the database's schema. Fails on a database with no user
    /// tables, which could never answer a question.
    pub fn from_database(database: &SqlDatabase) -> Result<Self> {
        let tables = database.schema_texts()?;
        if tables.is_empty() {
            return Err(SqlGenError::Schema(format!(
                "Database '{}' has no tables",
                database.db_id()
            )));
        }
        Ok(Self {
            tables,
            top_k: DEFAULT_CONTEXT_TOP_K,
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Builds the schema index backing `query_index_for_context`.
    pub async fn derive_index(&self, embedder: Arc<dyn EmbeddingModel>) -> Result<SchemaIndex> {
        SchemaIndex::build(self.tables.clone(), embedder).await
    }

    /// Retrieves the table descriptions most relevant to the question.
    pub async fn query_index_for_context(
        &self,
        index: &SchemaIndex,
        question: &str,
    ) -> Result<String> {
        let results = index.search(question, self.top_k).await?;
        let texts: Vec<&str> = results.iter().map(|r| r.document.text.as_str()).collect();
        Ok(texts.join("\n\n"))
    }

    pub fn build_context_container(&self, context_str: String) -> SqlContextContainer {
        SqlContextContainer { context_str }
    }
}
