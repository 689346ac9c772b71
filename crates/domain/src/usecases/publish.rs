//! Publish cycle - delivers unposted articles one at a time
//!
//! Articles are never processed concurrently: both the summarization backend
//! and the downstream channel enforce rate limits that a single process must
//! respect.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::model::{Article, ArticleOutcome};
use crate::ports::{
    ArticleStore, ContentError, ContentResolver, Notifier, SummarizeError, Summarizer,
};
use crate::text::logical_len;
use crate::usecases::render::{RenderConfig, Renderer};

/// Configuration for the publish cycle
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Stored summaries at least this long (in characters) are used verbatim
    pub min_summary_chars: usize,
    pub render_config: RenderConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            min_summary_chars: 400,
            render_config: RenderConfig::default(),
        }
    }
}

/// Why no summary could be produced for an article
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Content resolution failed: {0}")]
    Content(#[from] ContentError),
    #[error("Summarization failed: {0}")]
    Summarize(#[from] SummarizeError),
}

/// Recurring publish cycle
pub struct PublishCycle<St, R, Sm, N>
where
    St: ArticleStore + ?Sized,
    R: ContentResolver + ?Sized,
    Sm: Summarizer + ?Sized,
    N: Notifier + ?Sized,
{
    store: Arc<St>,
    resolver: Arc<R>,
    summarizer: Arc<Sm>,
    notifier: Arc<N>,
    config: PublishConfig,
    renderer: Renderer,
    cancel: CancellationToken,
}

impl<St, R, Sm, N> PublishCycle<St, R, Sm, N>
where
    St: ArticleStore + ?Sized,
    R: ContentResolver + ?Sized,
    Sm: Summarizer + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(
        store: Arc<St>,
        resolver: Arc<R>,
        summarizer: Arc<Sm>,
        notifier: Arc<N>,
        config: PublishConfig,
    ) -> Self {
        let renderer = Renderer::new(config.render_config.clone());
        Self {
            store,
            resolver,
            summarizer,
            notifier,
            config,
            renderer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between articles, and abandon summary resolution, once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one cycle. Article-level failures are logged and reported, never
    /// returned as errors; failed articles stay unposted for the next cycle.
    pub async fn run(&self) -> Vec<(i64, ArticleOutcome)> {
        let articles = match self.store.list_unposted_articles().await {
            Ok(articles) => articles,
            Err(error) => {
                tracing::error!(error = %error, "Failed to load unposted articles");
                return vec![];
            }
        };

        if articles.is_empty() {
            tracing::debug!("No unposted articles");
            return vec![];
        }

        tracing::info!(count = articles.len(), "Publishing unposted articles");

        let mut results = Vec::with_capacity(articles.len());
        for article in articles {
            if self.cancel.is_cancelled() {
                tracing::info!("Publish cycle interrupted by shutdown");
                break;
            }
            let outcome = self.publish_article(&article).await;
            results.push((article.id, outcome));
        }

        results
    }

    async fn publish_article(&self, article: &Article) -> ArticleOutcome {
        let summary = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ArticleOutcome::Cancelled,
            summary = self.resolve_summary(article) => summary,
        };

        let summary = match summary {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!(
                    article_id = article.id,
                    link = %article.link,
                    error = %error,
                    "Failed to produce summary, skipping article"
                );
                return ArticleOutcome::SummaryFailed {
                    error: error.to_string(),
                };
            }
        };

        if self.cancel.is_cancelled() {
            return ArticleOutcome::Cancelled;
        }

        let message = self.renderer.render(article, &summary);
        if let Err(error) = self.notifier.send(&message).await {
            tracing::error!(
                article_id = article.id,
                destination = self.notifier.destination(),
                error = %error,
                "Failed to deliver article"
            );
            return ArticleOutcome::DeliveryFailed {
                error: error.to_string(),
            };
        }

        match self.store.mark_posted(article.id).await {
            Ok(()) => {
                tracing::info!(article_id = article.id, link = %article.link, "Published article");
                ArticleOutcome::Posted
            }
            Err(error) => {
                tracing::error!(
                    article_id = article.id,
                    error = %error,
                    "Article delivered but could not be marked as posted"
                );
                ArticleOutcome::PostedUnrecorded {
                    error: error.to_string(),
                }
            }
        }
    }

    /// Use a long enough stored summary verbatim; otherwise summarize the
    /// article's page and separate the result from the title by a blank line.
    pub async fn resolve_summary(&self, article: &Article) -> Result<String, SummaryError> {
        if logical_len(&article.summary) >= self.config.min_summary_chars {
            return Ok(article.summary.clone());
        }

        let content = self.resolver.extract_main_text(&article.link).await?;
        let summary = self.summarizer.summarize(&content).await?;

        Ok(format!("\n\n{}", summary))
    }
}
