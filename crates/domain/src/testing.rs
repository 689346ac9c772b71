//! Fake port implementations shared by the use case tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::model::{Article, Feed, FeedEntry, NewArticle, RenderedMessage};
use crate::ports::{
    ArticleStore, Clock, ContentError, ContentResolver, FeedSource, FeedSourceError, Notifier,
    NotifyError, StorageError, SummarizeError, Summarizer,
};

pub(crate) const EPOCH: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

pub(crate) fn feed(id: i64) -> Feed {
    Feed {
        id,
        name: format!("feed {}", id),
        url: format!("https://example.com/{}.xml", id),
    }
}

pub(crate) fn entry(link: &str, minutes: i64) -> FeedEntry {
    FeedEntry {
        title: format!("Title of {}", link),
        link: link.to_string(),
        description: "<p>Short <b>teaser</b></p>".to_string(),
        published_at: EPOCH + time::Duration::minutes(minutes),
    }
}

pub(crate) fn new_article(link: &str, summary: &str, minutes: i64) -> NewArticle {
    NewArticle {
        feed_id: 1,
        title: format!("Title of {}", link),
        link: link.to_string(),
        summary: summary.to_string(),
        published_at: EPOCH + time::Duration::minutes(minutes),
    }
}

pub(crate) struct FakeStore {
    pub feeds: Mutex<Vec<Feed>>,
    pub articles: Mutex<Vec<Article>>,
    next_id: AtomicI64,
    /// `list_feeds` fails from this call index on (0-based)
    fail_feeds_from: AtomicUsize,
    pub list_feeds_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    fail_deletes: AtomicBool,
}

impl FakeStore {
    pub fn new(feeds: Vec<Feed>) -> Self {
        Self {
            feeds: Mutex::new(feeds),
            articles: Mutex::new(vec![]),
            next_id: AtomicI64::new(1),
            fail_feeds_from: AtomicUsize::new(usize::MAX),
            list_feeds_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn fail_feeds(&self) {
        self.fail_feeds_from.store(0, Ordering::SeqCst);
    }

    pub fn fail_feeds_after(&self, successful_calls: usize) {
        self.fail_feeds_from
            .store(successful_calls, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn posted_links(&self) -> Vec<String> {
        self.articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.posted_at.is_some())
            .map(|a| a.link.clone())
            .collect()
    }

    pub fn count_link(&self, link: &str) -> usize {
        self.articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.link == link)
            .count()
    }
}

#[async_trait]
impl ArticleStore for FakeStore {
    async fn list_feeds(&self) -> Result<Vec<Feed>, StorageError> {
        let call = self.list_feeds_calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_feeds_from.load(Ordering::SeqCst) {
            return Err(StorageError::Database("connection refused".to_string()));
        }
        Ok(self.feeds.lock().unwrap().clone())
    }

    async fn insert_article_if_absent(&self, article: &NewArticle) -> Result<bool, StorageError> {
        let mut articles = self.articles.lock().unwrap();
        if articles.iter().any(|a| a.link == article.link) {
            return Ok(false);
        }
        articles.push(Article {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            feed_id: article.feed_id,
            title: article.title.clone(),
            link: article.link.clone(),
            summary: article.summary.clone(),
            published_at: article.published_at,
            posted_at: None,
        });
        Ok(true)
    }

    async fn list_unposted_articles(&self) -> Result<Vec<Article>, StorageError> {
        let mut unposted: Vec<Article> = self
            .articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.posted_at.is_none())
            .cloned()
            .collect();
        unposted.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(unposted)
    }

    async fn mark_posted(&self, article_id: i64) -> Result<(), StorageError> {
        let mut articles = self.articles.lock().unwrap();
        if let Some(article) = articles
            .iter_mut()
            .find(|a| a.id == article_id && a.posted_at.is_none())
        {
            article.posted_at = Some(EPOCH);
        }
        Ok(())
    }

    async fn delete_posted_older_than(&self, _days: u32) -> Result<u64, StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        Ok(0)
    }
}

#[derive(Default)]
pub(crate) struct FakeFeedSource {
    pub entries: HashMap<String, Vec<FeedEntry>>,
    pub failing: HashSet<String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeFeedSource {
    pub fn with_entries(mut self, feed: &Feed, entries: Vec<FeedEntry>) -> Self {
        self.entries.insert(feed.url.clone(), entries);
        self
    }

    pub fn failing(mut self, feed: &Feed) -> Self {
        self.failing.insert(feed.url.clone());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl FeedSource for FakeFeedSource {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>, FeedSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(url) {
            return Err(FeedSourceError::Status(503));
        }
        Ok(self.entries.get(url).cloned().unwrap_or_default())
    }
}

pub(crate) struct FakeResolver {
    pub text: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn ok(text: &str) -> Self {
        Self {
            text: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: Err("connection reset".to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentResolver for FakeResolver {
    async fn extract_main_text(&self, _url: &str) -> Result<String, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone().map_err(ContentError::Fetch)
    }
}

pub(crate) struct FakeSummarizer {
    pub summary: Option<String>,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn ok(summary: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(vec![]),
        }
    }

    pub fn failing() -> Self {
        Self {
            summary: None,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        self.summary.clone().ok_or(SummarizeError::RateLimited)
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Mutex<Vec<RenderedMessage>>,
    pub send_times: Mutex<Vec<tokio::time::Instant>>,
    pub failing_links: HashSet<String>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing_for(mut self, link: &str) -> Self {
        self.failing_links.insert(link.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent_links(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.link.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.send_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_links.contains(&message.link) {
            return Err(NotifyError::Api("Bad Request: can't parse entities".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn destination(&self) -> &'static str {
        "recording"
    }
}

pub(crate) struct FixedClock {
    now: Mutex<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: time::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}
