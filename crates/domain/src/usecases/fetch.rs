//! Fetch cycle - polls every feed and stores newly sighted articles

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::cache::{FeedCache, FeedListOrigin};
use crate::model::{Feed, FeedReport, FetchReport, NewArticle};
use crate::ports::{ArticleStore, Clock, FeedSource, FeedSourceError, StorageError};
use crate::text::clean_text;

/// Errors that abort a whole fetch cycle
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to load feed list and no cached list is available: {0}")]
    FeedList(#[from] StorageError),
}

/// Recurring fetch cycle. Owns the feed list cache, so it is driven by a
/// single task and takes `&mut self`.
pub struct FetchCycle<St, F, Cl>
where
    St: ArticleStore + ?Sized,
    F: FeedSource + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    source: Arc<F>,
    clock: Arc<Cl>,
    cache: FeedCache,
    cancel: CancellationToken,
}

impl<St, F, Cl> FetchCycle<St, F, Cl>
where
    St: ArticleStore + ?Sized + 'static,
    F: FeedSource + ?Sized + 'static,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, source: Arc<F>, clock: Arc<Cl>, cache_ttl: Duration) -> Self {
        Self {
            store,
            source,
            clock,
            cache: FeedCache::new(cache_ttl),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight feed retrievals when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one cycle. Individual feed failures are logged and counted; only a
    /// feed list that cannot be resolved at all fails the cycle.
    pub async fn run(&mut self) -> Result<FetchReport, FetchError> {
        let now = self.clock.now();
        let (feeds, origin) = match self.cache.resolve(self.store.as_ref(), now).await {
            Ok(resolved) => resolved,
            Err(error) => {
                tracing::error!(error = %error, "Failed to load feeds from storage");
                return Err(FetchError::FeedList(error));
            }
        };

        if origin == FeedListOrigin::Storage {
            tracing::debug!(feed_count = feeds.len(), "Refreshed feed list");
        }

        let mut report = FetchReport {
            feeds: feeds.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for feed in feeds {
            let store = Arc::clone(&self.store);
            let source = Arc::clone(&self.source);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                poll_feed(store.as_ref(), source.as_ref(), &feed, &cancel).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(feed_report)) => {
                    report.entries += feed_report.entries;
                    report.inserted += feed_report.inserted;
                }
                Ok(Err(_)) => report.failed_feeds += 1,
                Err(error) => {
                    tracing::error!(error = %error, "Feed task aborted");
                    report.failed_feeds += 1;
                }
            }
        }

        tracing::info!(
            feeds = report.feeds,
            failed_feeds = report.failed_feeds,
            entries = report.entries,
            inserted = report.inserted,
            "Fetch cycle complete"
        );

        Ok(report)
    }
}

/// Retrieve one feed and dedup-insert its entries
async fn poll_feed<St, F>(
    store: &St,
    source: &F,
    feed: &Feed,
    cancel: &CancellationToken,
) -> Result<FeedReport, FeedSourceError>
where
    St: ArticleStore + ?Sized,
    F: FeedSource + ?Sized,
{
    let entries = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(feed = %feed.name, "Feed retrieval cancelled");
            return Ok(FeedReport::default());
        }
        result = source.fetch_entries(&feed.url) => result,
    };

    let entries = entries.inspect_err(|error| {
        tracing::error!(feed = %feed.name, url = %feed.url, error = %error, "Failed to load feed");
    })?;

    let mut report = FeedReport {
        entries: entries.len(),
        inserted: 0,
    };

    for entry in entries {
        let link = entry.link.trim();
        if link.is_empty() {
            continue;
        }

        let article = NewArticle {
            feed_id: feed.id,
            title: entry.title.trim().to_string(),
            link: link.to_string(),
            summary: clean_text(&entry.description),
            published_at: entry.published_at,
        };

        match store.insert_article_if_absent(&article).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => {}
            Err(error) => {
                tracing::error!(
                    feed = %feed.name,
                    link = %article.link,
                    error = %error,
                    "Failed to store article"
                );
            }
        }
    }

    tracing::debug!(
        feed = %feed.name,
        entries = report.entries,
        inserted = report.inserted,
        "Polled feed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EPOCH, FakeFeedSource, FakeStore, FixedClock, entry, feed};
    use std::sync::atomic::Ordering;

    fn cycle(
        store: Arc<FakeStore>,
        source: FakeFeedSource,
        clock: Arc<FixedClock>,
    ) -> FetchCycle<FakeStore, FakeFeedSource, FixedClock> {
        FetchCycle::new(store, Arc::new(source), clock, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_inserts_sanitized_entries() {
        let store = Arc::new(FakeStore::new(vec![feed(1)]));
        let source = FakeFeedSource::default().with_entries(&feed(1), vec![entry("https://a/1", 0)]);
        let mut fetch = cycle(Arc::clone(&store), source, Arc::new(FixedClock::new(EPOCH)));

        let report = fetch.run().await.unwrap();

        assert_eq!(report.inserted, 1);
        let articles = store.articles.lock().unwrap().clone();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].summary, "Short teaser");
        assert_eq!(articles[0].feed_id, 1);
    }

    #[tokio::test]
    async fn test_repeated_sightings_store_one_article() {
        let store = Arc::new(FakeStore::new(vec![feed(1), feed(2)]));
        let source = FakeFeedSource::default()
            .with_entries(
                &feed(1),
                vec![entry("https://a/1", 0), entry("https://a/1", 5)],
            )
            .with_entries(&feed(2), vec![entry("https://a/1", 10)]);
        let mut fetch = cycle(Arc::clone(&store), source, Arc::new(FixedClock::new(EPOCH)));

        fetch.run().await.unwrap();
        fetch.run().await.unwrap();
        fetch.run().await.unwrap();

        assert_eq!(store.count_link("https://a/1"), 1);
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_abort_siblings() {
        let store = Arc::new(FakeStore::new(vec![feed(1), feed(2), feed(3)]));
        let source = FakeFeedSource::default()
            .with_entries(&feed(1), vec![entry("https://a/1", 0)])
            .failing(&feed(2))
            .with_entries(&feed(3), vec![entry("https://c/1", 0), entry("https://c/2", 1)]);
        let mut fetch = cycle(Arc::clone(&store), source, Arc::new(FixedClock::new(EPOCH)));

        let report = fetch.run().await.unwrap();

        assert_eq!(report.feeds, 3);
        assert_eq!(report.failed_feeds, 1);
        assert_eq!(report.inserted, 3);
    }

    #[tokio::test]
    async fn test_feed_list_failure_without_cache_fails_cycle() {
        let store = Arc::new(FakeStore::new(vec![feed(1)]));
        store.fail_feeds();
        let mut fetch = cycle(store, FakeFeedSource::default(), Arc::new(FixedClock::new(EPOCH)));

        let result = fetch.run().await;

        assert!(matches!(result, Err(FetchError::FeedList(_))));
    }

    #[tokio::test]
    async fn test_stale_cache_keeps_cycle_alive() {
        let store = Arc::new(FakeStore::new(vec![feed(1)]));
        let clock = Arc::new(FixedClock::new(EPOCH));
        let source = FakeFeedSource::default().with_entries(&feed(1), vec![entry("https://a/1", 0)]);
        let mut fetch = cycle(Arc::clone(&store), source, Arc::clone(&clock));

        fetch.run().await.unwrap();
        store.fail_feeds();
        clock.advance(time::Duration::hours(3));

        let report = fetch.run().await.unwrap();

        assert_eq!(report.feeds, 1);
        assert_eq!(store.list_feeds_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feeds_are_polled_concurrently() {
        let feeds: Vec<Feed> = (1..=5).map(feed).collect();
        let store = Arc::new(FakeStore::new(feeds));
        let source = FakeFeedSource::default().with_delay(Duration::from_secs(10));
        let mut fetch = cycle(store, source, Arc::new(FixedClock::new(EPOCH)));

        let start = tokio::time::Instant::now();
        fetch.run().await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_abandons_in_flight_retrievals() {
        let store = Arc::new(FakeStore::new(vec![feed(1)]));
        let source = FakeFeedSource::default()
            .with_entries(&feed(1), vec![entry("https://a/1", 0)])
            .with_delay(Duration::from_secs(600));
        let cancel = CancellationToken::new();
        let mut fetch = cycle(Arc::clone(&store), source, Arc::new(FixedClock::new(EPOCH)))
            .with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let report = fetch.run().await.unwrap();

        assert_eq!(report.inserted, 0);
        assert!(store.articles.lock().unwrap().is_empty());
    }
}
