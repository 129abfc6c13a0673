use std::env;

use crate::error::{Result, SqlGenError};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for the OpenAI-compatible API used for both chat
/// completions and embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    /// Reads the configuration from the environment. `OPENAI_API_KEY` is
    /// required; everything else falls back to the defaults above.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| SqlGenError::Config("OPENAI_API_KEY is not set".to_string()))?;

        Ok(Self {
            api_key,
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}
