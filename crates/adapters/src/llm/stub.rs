//! Stub summarizer selected with `llm.provider = "stub"`

use async_trait::async_trait;
use courier_domain::{SummarizeError, Summarizer};

/// Stub summarizer: a fixed reply, a fixed error, or the leading sentence
/// of the input
pub enum StubSummarizer {
    Fixed(String),
    Failing(String),
    Lead,
}

impl StubSummarizer {
    pub fn fixed(summary: impl Into<String>) -> Self {
        Self::Fixed(summary.into())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::Failing(message.into())
    }

    /// Echo the input up to its first sentence end, capped at 500 characters
    pub fn lead() -> Self {
        Self::Lead
    }
}

impl Default for StubSummarizer {
    fn default() -> Self {
        Self::lead()
    }
}

fn lead_sentence(text: &str) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    text[..end].chars().take(500).collect()
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        match self {
            Self::Fixed(summary) => Ok(summary.clone()),
            Self::Failing(message) => Err(SummarizeError::Api(message.clone())),
            Self::Lead => {
                let lead = lead_sentence(text);
                if lead.is_empty() {
                    Err(SummarizeError::InvalidFormat("Nothing to summarize".to_string()))
                } else {
                    Ok(lead)
                }
            }
        }
    }
}
