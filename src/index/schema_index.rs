//! Vector index over one database's table schemas.

use std::sync::Arc;

use crate::error::Result;
use crate::index::embedder::EmbeddingModel;
use crate::index::vector_store::{Document, InMemoryVectorStore, SearchResult};

/// One document per user table, embedded once at build time. Searching
/// embeds the question and returns the closest table descriptions.
pub struct SchemaIndex {
    store: InMemoryVectorStore,
    embedder: Arc<dyn EmbeddingModel>,
}

impl SchemaIndex {
    /// Builds the index from `(table, description)` pairs, embedding each
    /// description with the given model.
    pub async fn build(
        tables: Vec<(String, String)>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self> {
        let mut store = InMemoryVectorStore::new();
        for (table, text) in tables {
            let embedding = embedder.embed(&text).await?;
            store.add_document(Document {
                id: table,
                text,
                embedding,
            })?;
        }
        Ok(Self { store, embedder })
    }

    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(question).await?;
        self.store.search(&query_embedding, top_k)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::vector_store::Embedding;
    use async_trait::async_trait;

    /// Maps known words onto fixed axes so similarity is predictable.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingModel for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("singer").count() as f32,
                lower.matches("stadium").count() as f32,
                1.0,
            ])
        }
    }

    #[tokio::test]
    async fn search_returns_closest_table() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tables = vec![
            (
                "singer".to_string(),
                "Table 'singer' has columns: singer_id (INTEGER), name (TEXT).".to_string(),
            ),
            (
                "stadium".to_string(),
                "Table 'stadium' has columns: stadium_id (INTEGER), capacity (INTEGER)."
                    .to_string(),
            ),
        ];
        let index = SchemaIndex::build(tables, Arc::new(KeywordEmbedder)).await?;
        assert_eq!(index.len(), 2);

        let results = index.search("How many singers do we have?", 1).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "singer");
        Ok(())
    }
}
