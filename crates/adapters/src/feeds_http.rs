//! HTTP feed source: downloads RSS, Atom or JSON feeds and parses them

use async_trait::async_trait;
use courier_domain::{FeedEntry, FeedSource, FeedSourceError};
use feed_rs::parser;
use reqwest::Client;
use time::OffsetDateTime;

/// Feed source backed by plain HTTP GET requests
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_offset(timestamp: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp).ok()
}

/// Convert a parsed feed into domain entries. Entries without a link are
/// dropped; the publication time falls back to the update time, then to
/// `retrieved_at`.
pub fn entries_from_feed(feed: feed_rs::model::Feed, retrieved_at: OffsetDateTime) -> Vec<FeedEntry> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first()?.href.trim().to_string();
            if link.is_empty() {
                return None;
            }

            let published_at = entry
                .published
                .or(entry.updated)
                .and_then(|dt| to_offset(dt.timestamp()))
                .unwrap_or(retrieved_at);

            Some(FeedEntry {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link,
                description: entry.summary.map(|s| s.content).unwrap_or_default(),
                published_at,
            })
        })
        .collect()
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedSourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedSourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedSourceError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedSourceError::Network(e.to_string()))?;

        let feed = parser::parse(body.as_ref())
            .map_err(|e| FeedSourceError::Parse(e.to_string()))?;

        let entries = entries_from_feed(feed, OffsetDateTime::now_utc());
        tracing::debug!(url = %url, count = entries.len(), "Parsed feed");

        Ok(entries)
    }
}
