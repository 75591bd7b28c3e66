//! Remote text-completion endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{PipelineError, RequestError, Result};

pub const SYSTEM_PROMPT: &str = "你是一个情感分析专家，请分析用户提供的文本的情感倾向。";

const USER_PROMPT_PREFIX: &str =
    "请分析以下文本的情感倾向，请直接返回结果：非常积极、积极、中性、消极、非常消极：";

pub fn user_prompt(text: &str) -> String {
    format!("{}{}", USER_PROMPT_PREFIX, text)
}

/// What a completion service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Trimmed content of the first choice.
    Reply(String),
    /// The response held no choice at all; carries the raw body.
    NoChoice(String),
}

/// One round trip to a completion service. Timeouts are applied by the caller.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, text: &str) -> std::result::Result<Completion, RequestError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completions backend speaking the OpenAI-compatible wire format.
pub struct HttpCompletionBackend {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpCompletionBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "HttpCompletionBackend: api_key must not be empty".to_string(),
            ));
        }
        let http = Client::builder()
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpCompletionBackend {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request<'a>(&'a self, text: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(text),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    fn name(&self) -> &'static str {
        "HttpCompletionBackend"
    }

    async fn complete(&self, text: &str) -> std::result::Result<Completion, RequestError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let body = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        debug!(choices = parsed.choices.len(), "Completion response received");
        match parsed.choices.into_iter().next() {
            Some(choice) => Ok(Completion::Reply(choice.message.content.trim().to_string())),
            None => Ok(Completion::NoChoice(
                String::from_utf8_lossy(&body).into_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = ClientConfig::new("key");
        let backend = HttpCompletionBackend::new(&config).unwrap();
        let body = serde_json::to_value(backend.build_request("今天很开心")).unwrap();

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["max_tokens"], 100);
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .ends_with("：今天很开心"));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let mut config = ClientConfig::new("key");
        config.api_base = "http://localhost:8080/".to_string();
        let backend = HttpCompletionBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8080/chat/completions");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = ClientConfig::new("  ");
        assert!(HttpCompletionBackend::new(&config).is_err());
    }

    #[test]
    fn test_missing_choices_parses_as_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn test_choice_without_content_is_rejected() {
        let parsed = serde_json::from_str::<ChatResponse>(
            r#"{"choices": [{"message": {"role": "assistant"}}]}"#,
        );
        assert!(parsed.is_err());
    }
}
