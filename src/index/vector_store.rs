//! In-memory vector store with linear cosine-similarity search.
//!
//! Spider schemas hold at most a few dozen tables per database, so a linear
//! scan over the embeddings is plenty.

use crate::error::{Result, SqlGenError};

/// Vector embedding (simple f32 vector)
pub type Embedding = Vec<f32>;

/// Document in the vector store
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub embedding: Embedding,
}

/// Search result from the vector store
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Stores documents in insertion order. The embedding dimension is fixed by
/// the first document added; later documents and queries must match it.
#[derive(Default)]
pub struct InMemoryVectorStore {
    documents: Vec<Document>,
    dimension: Option<usize>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, document: Document) -> Result<()> {
        if document.embedding.is_empty() {
            return Err(SqlGenError::Embedding(format!(
                "Document '{}' has an empty embedding",
                document.id
            )));
        }
        match self.dimension {
            None => self.dimension = Some(document.embedding.len()),
            Some(dimension) if dimension != document.embedding.len() => {
                return Err(SqlGenError::Embedding(format!(
                    "Embedding dimension {} for document '{}' doesn't match store dimension {}",
                    document.embedding.len(),
                    document.id,
                    dimension
                )));
            }
            Some(_) => {}
        }
        self.documents.push(document);
        Ok(())
    }

    /// Returns the `top_k` most similar documents, best first.
    pub fn search(&self, query_embedding: &Embedding, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.documents.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(dimension) = self.dimension {
            if query_embedding.len() != dimension {
                return Err(SqlGenError::Embedding(format!(
                    "Query embedding dimension {} doesn't match store dimension {}",
                    query_embedding.len(),
                    dimension
                )));
            }
        }

        let mut results: Vec<SearchResult> = self
            .documents
            .iter()
            .map(|doc| SearchResult {
                document: doc.clone(),
                score: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        // Sort by score descending and take top_k
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Compute cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Embedding) -> Document {
        Document {
            id: id.to_string(),
            text: format!("text for {}", id),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 1.0);

        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn search_ranks_by_similarity() {
        let mut store = InMemoryVectorStore::new();
        store.add_document(doc("x_axis", vec![1.0, 0.0])).unwrap();
        store.add_document(doc("y_axis", vec![0.0, 1.0])).unwrap();
        store.add_document(doc("diagonal", vec![1.0, 1.0])).unwrap();

        let results = store.search(&vec![1.0, 0.1], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "x_axis");
        assert_eq!(results[1].document.id, "diagonal");
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut store = InMemoryVectorStore::new();
        store.add_document(doc("a", vec![1.0, 0.0])).unwrap();
        assert!(store.add_document(doc("b", vec![1.0, 0.0, 0.0])).is_err());
        assert!(store.search(&vec![1.0], 1).is_err());
    }

    #[test]
    fn empty_store_returns_no_results() {
        let store = InMemoryVectorStore::new();
        assert!(store.search(&vec![1.0, 0.0], 3).unwrap().is_empty());
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}
