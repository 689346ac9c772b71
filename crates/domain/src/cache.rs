//! Feed list caching policy
//!
//! The cache is owned by the fetch cycle and never shared, so it needs no
//! synchronization. Staleness decides whether a refresh is attempted; it never
//! makes a cached list unavailable.

use std::time::Duration;

use time::OffsetDateTime;

use crate::model::Feed;
use crate::ports::{ArticleStore, StorageError};

/// Where a resolved feed list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedListOrigin {
    /// Cache entry younger than the TTL
    Cache,
    /// Freshly loaded from storage
    Storage,
    /// Storage failed; an expired cache entry was used instead
    StaleCache,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    feeds: Vec<Feed>,
    fetched_at: OffsetDateTime,
}

/// Last successfully retrieved feed list plus its retrieval time
#[derive(Debug, Clone)]
pub struct FeedCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Cached feeds if the entry is younger than the TTL
    pub fn fresh(&self, now: OffsetDateTime) -> Option<&[Feed]> {
        self.entry
            .as_ref()
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .map(|entry| entry.feeds.as_slice())
    }

    /// Cached feeds regardless of age
    pub fn any(&self) -> Option<&[Feed]> {
        self.entry.as_ref().map(|entry| entry.feeds.as_slice())
    }

    pub fn store(&mut self, feeds: Vec<Feed>, now: OffsetDateTime) {
        self.entry = Some(CacheEntry {
            feeds,
            fetched_at: now,
        });
    }

    /// Resolve the feed list: fresh cache, then storage, then any cached entry.
    /// Fails only when storage fails and nothing was ever cached.
    pub async fn resolve<S>(
        &mut self,
        store: &S,
        now: OffsetDateTime,
    ) -> Result<(Vec<Feed>, FeedListOrigin), StorageError>
    where
        S: ArticleStore + ?Sized,
    {
        if let Some(feeds) = self.fresh(now) {
            return Ok((feeds.to_vec(), FeedListOrigin::Cache));
        }

        match store.list_feeds().await {
            Ok(feeds) => {
                self.store(feeds.clone(), now);
                Ok((feeds, FeedListOrigin::Storage))
            }
            Err(error) => match self.any() {
                Some(feeds) => {
                    tracing::warn!(
                        error = %error,
                        "Failed to load feeds from storage, using cached list"
                    );
                    Ok((feeds.to_vec(), FeedListOrigin::StaleCache))
                }
                None => Err(error),
            },
        }
    }
}
