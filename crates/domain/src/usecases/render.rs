//! Rendering - turns an article and its summary into a deliverable message

use crate::model::{Article, RenderedMessage};
use crate::text::logical_len;

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum visible characters per message (Telegram allows 4096)
    pub max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { max_chars: 4096 }
    }
}

/// Renderer for downstream messages
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Combine title, summary body and link. The body is shortened when the
    /// whole message would exceed the configured limit; title and link are
    /// never cut.
    pub fn render(&self, article: &Article, body: &str) -> RenderedMessage {
        let title = article.title.trim().to_string();
        let fixed = logical_len(&title) + logical_len(&article.link) + 2;
        let available = self.config.max_chars.saturating_sub(fixed);

        RenderedMessage {
            article_id: article.id,
            title,
            body: truncate_chars(body, available),
            link: article.link.clone(),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if logical_len(text) <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut truncated: String = text.chars().take(max - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EPOCH;

    fn article(title: &str) -> Article {
        Article {
            id: 7,
            feed_id: 1,
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            summary: String::new(),
            published_at: EPOCH,
            posted_at: None,
        }
    }

    #[test]
    fn test_render_keeps_parts() {
        let message = Renderer::default().render(&article(" Headline "), "\n\nBody text");

        assert_eq!(message.article_id, 7);
        assert_eq!(message.title, "Headline");
        assert_eq!(message.body, "\n\nBody text");
        assert_eq!(message.link, "https://example.com/a");
        assert_eq!(
            message.plain_text(),
            "Headline\n\nBody text\n\nhttps://example.com/a"
        );
    }

    #[test]
    fn test_render_allows_empty_body() {
        let message = Renderer::default().render(&article("Headline"), "");
        assert_eq!(message.body, "");
    }

    #[test]
    fn test_render_truncates_long_body() {
        let renderer = Renderer::new(RenderConfig { max_chars: 60 });
        let body = "ж".repeat(200);

        let message = renderer.render(&article("Headline"), &body);

        let total = logical_len(&message.title) + logical_len(&message.body) + 2
            + logical_len(&message.link);
        assert_eq!(total, 60);
        assert!(message.body.ends_with('…'));
    }
}
