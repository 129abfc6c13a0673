//! Schema Embedder
//!
//! Embeds table schema descriptions and questions using the OpenAI
//! embeddings API.

use async_trait::async_trait;

use crate::error::{Result, SqlGenError};
use crate::index::vector_store::Embedding;

/// Embedding backend for schema retrieval. Tests substitute a deterministic
/// implementation so no network is involved.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Embedding client using the OpenAI API
#[derive(Clone)]
pub struct SchemaEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String, // e.g., "text-embedding-3-small"
}

impl SchemaEmbedder {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SqlGenError::Embedding(format!("Embedding API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SqlGenError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SqlGenError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        parse_embedding_response(&response_json)
    }
}

#[async_trait]
impl EmbeddingModel for SchemaEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_text(text).await
    }
}

fn parse_embedding_response(response_json: &serde_json::Value) -> Result<Embedding> {
    let data = response_json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| SqlGenError::Embedding("No embedding data in response".to_string()))?;

    let embedding: Vec<f32> = data
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| SqlGenError::Embedding("No embedding vector in response".to_string()))?
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if embedding.is_empty() {
        return Err(SqlGenError::Embedding(
            "Empty embedding vector in response".to_string(),
        ));
    }

    Ok(embedding)
}
