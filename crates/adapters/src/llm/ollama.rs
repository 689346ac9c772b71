//! Ollama local LLM adapter

use async_trait::async_trait;
use courier_domain::{SummarizeError, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{LlmConfig, SYSTEM_INSTRUCTION, build_summary_prompt, transport_error, with_retries};

/// Ollama summarizer for local LLMs
pub struct OllamaSummarizer {
    client: Client,
    base_url: String,
    config: LlmConfig,
}

impl OllamaSummarizer {
    pub fn new(config: LlmConfig) -> Result<Self, SummarizeError> {
        Self::with_base_url("http://localhost:11434".to_string(), config)
    }

    pub fn with_base_url(base_url: String, config: LlmConfig) -> Result<Self, SummarizeError> {
        Ok(Self {
            client: config.http_client()?,
            base_url,
            config,
        })
    }

    async fn call_api(&self, prompt: &str) -> Result<String, SummarizeError> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
                num_predict: Some(self.config.max_output_tokens as i32),
            }),
        };

        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidFormat(e.to_string()))?;

        Ok(api_response.response)
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let prompt = build_summary_prompt(text);
        with_retries(self.config.retries, || self.call_api(&prompt)).await
    }
}
