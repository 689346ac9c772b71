//! courier adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite article store
//! - `feeds`: HTTP feed source (RSS, Atom, JSON Feed)
//! - `content`: HTTP article text extraction
//! - `llm`: LLM summarizers (OpenAI, Anthropic, Ollama, stub)
//! - `telegram`: Telegram channel notifier
//! - `outbox`: JSONL outbox notifier for review-before-publish

mod content_http;
mod feeds_http;
pub mod outbox;
mod store_sqlite;

pub mod llm;
pub mod telegram;

use reqwest::Client;
use std::time::Duration;

/// Re-exports for article store adapters
pub mod store {
    use serde::{Deserialize, Serialize};

    pub use crate::store_sqlite::SqliteArticleStore;

    /// A feed to insert into an empty database
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FeedSeed {
        pub name: String,
        pub url: String,
    }
}

/// Re-exports for feed source adapters
pub mod feeds {
    pub use crate::feeds_http::{HttpFeedSource, entries_from_feed};
}

/// Re-exports for content resolver adapters
pub mod content {
    pub use crate::content_http::{HttpContentResolver, extract_main_text};
}

/// Shared HTTP client for feed and page downloads
pub fn http_client(timeout: Duration, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .gzip(true)
        .build()
}
