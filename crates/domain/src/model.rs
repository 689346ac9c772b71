//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A named external source of articles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Storage identifier
    pub id: i64,
    /// Human-readable name
    pub name: String,
    /// Feed URL (RSS, Atom or JSON Feed)
    pub url: String,
}

/// A single entry as parsed from a feed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Raw description, may contain markup
    pub description: String,
    pub published_at: OffsetDateTime,
}

/// Insert payload for a freshly sighted article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub feed_id: i64,
    pub title: String,
    /// Canonical link, the deduplication key
    pub link: String,
    /// Sanitized summary text (may be empty)
    pub summary: String,
    pub published_at: OffsetDateTime,
}

/// A stored article tracked through the unposted -> posted lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// When the article was delivered downstream; `None` while unposted
    #[serde(with = "time::serde::rfc3339::option")]
    pub posted_at: Option<OffsetDateTime>,
}

impl Article {
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }
}

/// Message ready for a notifier. Markup escaping belongs to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Article the message was rendered from
    pub article_id: i64,
    /// Rendered in bold by notifiers that support markup
    pub title: String,
    /// Summary body, possibly empty, possibly starting with a blank line
    pub body: String,
    pub link: String,
}

impl RenderedMessage {
    /// Plain-text rendering, used by notifiers without markup support
    pub fn plain_text(&self) -> String {
        format!("{}{}\n\n{}", self.title, self.body, self.link)
    }
}

/// Outcome of publishing a single article
#[derive(Debug)]
pub enum ArticleOutcome {
    /// Delivered and marked posted
    Posted,
    /// Delivered, but recording the posted state failed
    PostedUnrecorded { error: String },
    /// No summary could be produced; the article stays unposted
    SummaryFailed { error: String },
    /// The notifier rejected the message; the article stays unposted
    DeliveryFailed { error: String },
    /// Shutdown was requested before the article was delivered
    Cancelled,
}

impl ArticleOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(
            self,
            ArticleOutcome::Posted | ArticleOutcome::PostedUnrecorded { .. }
        )
    }
}

/// Result of polling a single feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub entries: usize,
    pub inserted: usize,
}

/// Summary of one fetch cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Feeds the cycle attempted to poll
    pub feeds: usize,
    /// Feeds whose retrieval or parsing failed
    pub failed_feeds: usize,
    /// Entries seen across all feeds
    pub entries: usize,
    /// Entries that produced a new article
    pub inserted: usize,
}
