//! HTTP content resolver: downloads an article page and extracts its main text

use async_trait::async_trait;
use courier_domain::text::clean_text;
use courier_domain::{ContentError, ContentResolver};
use readability::extractor;
use reqwest::Client;
use std::io::Cursor;
use url::Url;

/// Run the readability scorer over `html` and return the text of the winning
/// content node, one non-empty line per block with inner whitespace collapsed.
/// `url` resolves relative links while scoring.
pub fn extract_main_text(html: &str, url: &Url) -> Option<String> {
    let mut reader = Cursor::new(html.as_bytes());
    let product = match extractor::extract(&mut reader, url) {
        Ok(product) => product,
        Err(error) => {
            tracing::debug!(url = %url, error = ?error, "Readability extraction failed");
            return None;
        }
    };

    let text = clean_text(&product.content);
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Content resolver backed by plain HTTP GET requests
pub struct HttpContentResolver {
    client: Client,
}

impl HttpContentResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentResolver for HttpContentResolver {
    async fn extract_main_text(&self, url: &str) -> Result<String, ContentError> {
        let parsed = Url::parse(url).map_err(|e| ContentError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ContentError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| ContentError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Fetch(format!("HTTP status {}", status.as_u16())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ContentError::Fetch(e.to_string()))?;

        let text = extract_main_text(&html, &parsed)
            .ok_or_else(|| ContentError::Extraction("no readable text".to_string()))?;

        tracing::debug!(url = %url, chars = text.chars().count(), "Extracted article text");
        Ok(text)
    }
}
