//! Anthropic Messages API adapter

use async_trait::async_trait;
use courier_domain::{SummarizeError, Summarizer};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmConfig, SYSTEM_INSTRUCTION, build_summary_prompt, transport_error, with_retries};

/// Anthropic summarizer
pub struct AnthropicSummarizer {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl AnthropicSummarizer {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Result<Self, SummarizeError> {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> Result<Self, SummarizeError> {
        Ok(Self {
            client: config.http_client()?,
            api_key,
            base_url,
            config,
        })
    }

    async fn call_api(&self, prompt: &str) -> Result<String, SummarizeError> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            temperature: Some(self.config.temperature.min(1.0)),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == 429 {
            return Err(SummarizeError::RateLimited);
        }

        if response.status() == 401 {
            return Err(SummarizeError::Config(
                "Anthropic rejected the API key".to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidFormat(e.to_string()))?;

        Ok(api_response
            .content
            .into_iter()
            .filter(|c| c.r#type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let prompt = build_summary_prompt(text);
        with_retries(self.config.retries, || self.call_api(&prompt)).await
    }
}
