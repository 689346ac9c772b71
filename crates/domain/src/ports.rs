//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Article, Feed, FeedEntry, NewArticle, RenderedMessage};

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for durable storage of feeds and articles
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// List every configured feed
    async fn list_feeds(&self) -> Result<Vec<Feed>, StorageError>;

    /// Insert an article unless one with the same link exists.
    /// Returns `true` when a row was inserted.
    async fn insert_article_if_absent(&self, article: &NewArticle) -> Result<bool, StorageError>;

    /// Unposted articles, most recently published first
    async fn list_unposted_articles(&self) -> Result<Vec<Article>, StorageError>;

    /// Record delivery of an article. Already-posted articles are left untouched.
    async fn mark_posted(&self, article_id: i64) -> Result<(), StorageError>;

    /// Delete posted articles whose posted time is older than `days`.
    /// Returns the number of deleted rows.
    async fn delete_posted_older_than(&self, days: u32) -> Result<u64, StorageError>;
}

/// Error type for feed retrieval
#[derive(Debug, Error)]
pub enum FeedSourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for retrieving and parsing a feed document
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedSourceError>;
}

/// Error type for content resolution
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to fetch content: {0}")]
    Fetch(String),
    #[error("Invalid article URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to extract content: {0}")]
    Extraction(String),
}

/// Port for extracting the main text of a web page
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn extract_main_text(&self, url: &str) -> Result<String, ContentError>;
}

/// Error type for summarizer operations
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for condensing text into a short summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Error type for notifier operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<std::time::Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for delivering messages to the single downstream destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message; `Ok` means the destination confirmed it
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError>;

    /// Destination name for logs (e.g., "telegram")
    fn destination(&self) -> &'static str;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
