//! LLM summarizer adapters

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod stub;

pub use anthropic::AnthropicSummarizer;
pub use ollama::OllamaSummarizer;
pub use openai::OpenAiSummarizer;
pub use stub::StubSummarizer;

use courier_domain::SummarizeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// System instruction sent alongside every summary request
pub const SYSTEM_INSTRUCTION: &str =
    "You are a news editor. Reply with the summary only, in the language of the text.";

/// Article text longer than this (in characters) is cut before summarizing
pub const MAX_INPUT_CHARS: usize = 12_000;

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Temperature (0.0-2.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_output_tokens: 125,
            timeout_secs: 45,
            retries: 2,
        }
    }
}

impl LlmConfig {
    fn http_client(&self) -> Result<Client, SummarizeError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Config(format!("Failed to build HTTP client: {}", e)))
    }
}

/// Build the summarization prompt
pub fn build_summary_prompt(text: &str) -> String {
    let text = text.trim();
    let text: String = if text.chars().count() > MAX_INPUT_CHARS {
        text.chars().take(MAX_INPUT_CHARS).collect()
    } else {
        text.to_string()
    };

    format!(
        "Summarize the following text in approximately 400-500 characters:\n\n{}",
        text
    )
}

/// Normalize a model reply: trim whitespace, drop surrounding quotes and
/// markdown fences, reject empty output.
pub fn clean_summary(response: &str) -> Result<String, SummarizeError> {
    let mut text = response.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    for (open, close) in [('"', '"'), ('«', '»'), ('“', '”')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }

    if text.is_empty() {
        return Err(SummarizeError::InvalidFormat("Empty response".to_string()));
    }

    Ok(text.to_string())
}

/// Map a transport error onto the summarizer taxonomy
fn transport_error(error: reqwest::Error) -> SummarizeError {
    if error.is_timeout() {
        SummarizeError::Timeout
    } else {
        SummarizeError::Api(error.to_string())
    }
}

/// Run `call` up to `retries + 1` times with exponential backoff. Rate
/// limiting is returned immediately; the next publish cycle retries.
/// Upper bound for the pause between summarization attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff before retry number `attempt`: 1s, 2s, 4s, ... capped
/// at [`MAX_BACKOFF`]
fn backoff(attempt: u32) -> Duration {
    let millis = 500_u64.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

async fn with_retries<F, Fut>(retries: u32, mut call: F) -> Result<String, SummarizeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, SummarizeError>>,
{
    let mut last_error = None;
    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::warn!(attempt = attempt, "Retrying summarization");
            tokio::time::sleep(backoff(attempt)).await;
        }

        match call().await.and_then(|text| clean_summary(&text)) {
            Ok(summary) => return Ok(summary),
            Err(SummarizeError::RateLimited) => return Err(SummarizeError::RateLimited),
            Err(SummarizeError::Config(msg)) => return Err(SummarizeError::Config(msg)),
            Err(e) => {
                tracing::warn!(error = %e, "Summarization attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| SummarizeError::Api("Unknown error".to_string())))
}
