//! Client for OpenAI-compatible chat completion endpoints (DeepSeek,
//! SiliconFlow, OpenAI, vLLM, ...).

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Generator;
use crate::config::Config;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the assistant text from a chat completion body.
fn parse_completion(body: &str) -> anyhow::Result<String> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).context("malformed chat completion response")?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("LLM returned empty response"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiCompatClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("building LLM HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: 1000,
            temperature: 0.7,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut client =
            Self::new(config.api_key.clone(), &config.base_url, config.model.clone())?;
        client.max_tokens = config.max_tokens;
        client.temperature = config.temperature;
        Ok(client)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Generator for OpenAiCompatClient {
    async fn generate(&self, prompt: &str, context: &str) -> anyhow::Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        tracing::debug!(
            "Calling {} (model={}, context {} chars)",
            self.completions_url(),
            self.model,
            context.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "LLM API error {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            ));
        }

        let text = parse_completion(&body)?;
        tracing::info!("LLM call succeeded, answer length {}", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hello");
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(parse_completion(r#"{"choices":[]}"#).is_err());
        assert!(parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn url_has_no_double_slash() {
        let client =
            OpenAiCompatClient::new("k", "https://api.deepseek.com/v1/", "deepseek-chat").unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn from_config_carries_sampling_settings() {
        let mut config = Config::new("k".to_string(), "deepseek-chat".to_string());
        config.max_tokens = 256;
        config.temperature = 0.2;
        let client = OpenAiCompatClient::from_config(&config).unwrap();
        assert_eq!(client.max_tokens, 256);
        assert_eq!(client.temperature, 0.2);
        assert_eq!(client.model, "deepseek-chat");
    }
}
