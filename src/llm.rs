use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, SqlGenError};

/// Chat-completion backend for text-to-SQL generation. The structured index
/// only needs a prompt-in, text-out call, so tests can swap in a scripted
/// implementation.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        // Temperature 0 keeps the generated SQL reproducible across runs.
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0,
        });

        // Use max_completion_tokens for newer models, max_tokens for older ones.
        // Reasoning models spend tokens on reasoning before the completion.
        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = serde_json::json!(2000);
        } else if self.model.starts_with("gpt-4") {
            body["max_completion_tokens"] = serde_json::json!(500);
        } else {
            body["max_tokens"] = serde_json::json!(500);
        }

        let response = self
            .client
            .post(&format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SqlGenError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SqlGenError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SqlGenError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        parse_chat_response(&response_json)
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.call_llm(prompt).await
    }
}

/// Pulls the completion text out of an OpenAI chat-completions response.
fn parse_chat_response(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(SqlGenError::Llm(format!(
            "LLM API error: {}",
            serde_json::to_string(error).unwrap_or_else(|_| "Unknown error".to_string())
        )));
    }

    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| SqlGenError::Llm("No choices array in LLM response".to_string()))?;

    if choices.is_empty() {
        return Err(SqlGenError::Llm(
            "Empty choices array in LLM response".to_string(),
        ));
    }

    if let Some(finish_reason) = choices[0].get("finish_reason").and_then(|r| r.as_str()) {
        if finish_reason == "length" {
            warn!("LLM response was truncated by the token limit");
        } else if finish_reason == "content_filter" {
            return Err(SqlGenError::Llm(
                "LLM response was filtered by content policy".to_string(),
            ));
        }
    }

    let content = choices[0]["message"]["content"].as_str().ok_or_else(|| {
        SqlGenError::Llm(format!(
            "No content in LLM response. Response structure: {}",
            serde_json::to_string(response_json).unwrap_or_else(|_| "Could not serialize".to_string())
        ))
    })?;

    if content.is_empty() {
        return Err(SqlGenError::Llm("Empty content in LLM response".to_string()));
    }

    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_content() {
        let response = serde_json::json!({
            "choices": [
                {"message": {"content": "SELECT count(*) FROM singer"}, "finish_reason": "stop"}
            ]
        });
        assert_eq!(
            parse_chat_response(&response).unwrap(),
            "SELECT count(*) FROM singer"
        );
    }

    #[test]
    fn api_error_field_is_surfaced() {
        let response = serde_json::json!({
            "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
        });
        let err = parse_chat_response(&response).unwrap_err();
        assert!(err.to_string().contains("Rate limit reached"));
    }

    #[test]
    fn missing_choices_is_an_error() {
        let response = serde_json::json!({"object": "chat.completion"});
        assert!(parse_chat_response(&response).is_err());
    }

    #[test]
    fn content_filter_is_an_error() {
        let response = serde_json::json!({
            "choices": [
                {"message": {"content": "filtered"}, "finish_reason": "content_filter"}
            ]
        });
        assert!(parse_chat_response(&response).is_err());
    }

    #[test]
    fn empty_content_is_an_error() {
        let response = serde_json::json!({
            "choices": [
                {"message": {"content": ""}, "finish_reason": "stop"}
            ]
        });
        assert!(parse_chat_response(&response).is_err());
    }
}
