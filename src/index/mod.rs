//! Per-database index construction for text-to-SQL generation.

pub mod context;
pub mod embedder;
pub mod schema_index;
pub mod struct_index;
pub mod vector_store;

pub use context::*;
pub use embedder::*;
pub use schema_index::*;
pub use struct_index::*;
pub use vector_store::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::db::DatabaseRegistry;
use crate::error::Result;
use crate::llm::CompletionModel;

/// Everything needed to answer questions against one database: the
/// structured index that generates and runs SQL, the schema index used for
/// retrieval, and the context builder that ties them together.
pub struct IndexBundle {
    pub struct_index: TextToSqlIndex,
    pub schema_index: SchemaIndex,
    pub context_builder: SqlContextBuilder,
}

/// Builds one [`IndexBundle`] per registered database, keyed by db_id.
pub async fn build_index_bundles(
    registry: &DatabaseRegistry,
    model: Arc<dyn CompletionModel>,
    embedder: Arc<dyn EmbeddingModel>,
) -> Result<HashMap<String, IndexBundle>> {
    info!("Creating indexes for {} databases", registry.len());
    let mut bundles = HashMap::new();
    for database in registry.iter() {
        let start = Instant::now();
        let context_builder = SqlContextBuilder::from_database(database)?;
        let schema_index = context_builder.derive_index(embedder.clone()).await?;
        let struct_index = TextToSqlIndex::new(database.clone(), model.clone());
        info!(
            "Built indexes for database '{}' ({} tables) in {:.1}s",
            database.db_id(),
            schema_index.len(),
            start.elapsed().as_secs_f64()
        );
        bundles.insert(
            database.db_id().to_string(),
            IndexBundle {
                struct_index,
                schema_index,
                context_builder,
            },
        );
    }
    Ok(bundles)
}
