//! Orchestrator - drives the fetch, publish and retention cycles
//!
//! Lifecycle: `Starting -> Running -> Draining -> Stopped`. The first fetch
//! gates everything else: when it fails there is nothing trustworthy to
//! publish, so the process shuts down instead of limping along.

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::model::{ArticleOutcome, FetchReport};
use crate::ports::{ArticleStore, Clock, ContentResolver, FeedSource, Notifier, Summarizer};
use crate::usecases::fetch::{FetchCycle, FetchError};
use crate::usecases::publish::PublishCycle;
use crate::usecases::retention::{RETENTION_PERIOD, RetentionCycle};
use crate::usecases::schedule::{FirstRun, Ticker};

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub fetch_interval: Duration,
    pub publish_interval: Duration,
    pub retention_period: Duration,
    /// How long in-flight work may run after shutdown was requested
    pub shutdown_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(30 * 60),
            publish_interval: Duration::from_secs(30 * 60),
            retention_period: RETENTION_PERIOD,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// How the drain phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every task finished within the grace period
    Graceful,
    /// The grace period elapsed with work still in flight
    Forced,
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Initial fetch failed: {source}")]
    StartupFetch {
        source: FetchError,
        /// How the shutdown that followed the failure ended
        outcome: ShutdownOutcome,
    },
}

pub struct Orchestrator<St, F, Cl, R, Sm, N>
where
    St: ArticleStore + ?Sized,
    F: FeedSource + ?Sized,
    Cl: Clock + ?Sized,
    R: ContentResolver + ?Sized,
    Sm: Summarizer + ?Sized,
    N: Notifier + ?Sized,
{
    fetch: FetchCycle<St, F, Cl>,
    publish: PublishCycle<St, R, Sm, N>,
    retention: RetentionCycle<St>,
    config: OrchestratorConfig,
    state: watch::Sender<LifecycleState>,
}

impl<St, F, Cl, R, Sm, N> Orchestrator<St, F, Cl, R, Sm, N>
where
    St: ArticleStore + ?Sized + 'static,
    F: FeedSource + ?Sized + 'static,
    Cl: Clock + ?Sized + 'static,
    R: ContentResolver + ?Sized + 'static,
    Sm: Summarizer + ?Sized + 'static,
    N: Notifier + ?Sized + 'static,
{
    pub fn new(
        fetch: FetchCycle<St, F, Cl>,
        publish: PublishCycle<St, R, Sm, N>,
        retention: RetentionCycle<St>,
        config: OrchestratorConfig,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            fetch,
            publish,
            retention,
            config,
            state,
        }
    }

    /// Observe lifecycle transitions
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// One fetch cycle followed by one publish cycle, without scheduling
    pub async fn run_once(
        mut self,
    ) -> Result<(FetchReport, Vec<(i64, ArticleOutcome)>), FetchError> {
        let report = self.fetch.run().await?;
        let outcomes = self.publish.run().await;
        Ok((report, outcomes))
    }

    /// Run until `shutdown` fires, then drain for at most the grace period.
    ///
    /// A failed first fetch cancels `shutdown` itself and is returned as
    /// [`OrchestratorError::StartupFetch`] once draining is over.
    pub async fn run(self, shutdown: CancellationToken) -> Result<ShutdownOutcome, OrchestratorError> {
        let Self {
            fetch,
            publish,
            retention,
            config,
            state,
        } = self;

        let fetch = fetch.with_cancellation(shutdown.clone());
        let publish = publish.with_cancellation(shutdown.clone());

        let tracker = TaskTracker::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        tracing::info!(
            fetch_interval_secs = config.fetch_interval.as_secs(),
            publish_interval_secs = config.publish_interval.as_secs(),
            "Starting fetch task"
        );
        tracker.spawn(fetch_task(
            fetch,
            config.fetch_interval,
            shutdown.clone(),
            ready_tx,
        ));

        let mut startup_error = None;
        let readiness = tokio::select! {
            _ = shutdown.cancelled() => None,
            readiness = ready_rx => readiness.ok(),
        };

        match readiness {
            Some(Ok(report)) => {
                tracing::info!(
                    feeds = report.feeds,
                    inserted = report.inserted,
                    "Initial fetch complete, starting publish and retention tasks"
                );
                state.send_replace(LifecycleState::Running);
                tracker.spawn(publish_task(
                    publish,
                    config.publish_interval,
                    shutdown.clone(),
                ));
                tracker.spawn(retention_task(
                    retention,
                    config.retention_period,
                    shutdown.clone(),
                ));
                shutdown.cancelled().await;
            }
            Some(Err(error)) => {
                tracing::error!(error = %error, "Initial fetch failed, shutting down");
                startup_error = Some(error);
                shutdown.cancel();
            }
            None => {}
        }

        state.send_replace(LifecycleState::Draining);
        tracing::info!(
            grace_secs = config.shutdown_grace.as_secs(),
            "Shutting down"
        );

        tracker.close();
        let outcome = match tokio::time::timeout(config.shutdown_grace, tracker.wait()).await {
            Ok(()) => {
                tracing::info!("Graceful shutdown completed");
                ShutdownOutcome::Graceful
            }
            Err(_) => {
                tracing::warn!("Forced shutdown due to timeout");
                ShutdownOutcome::Forced
            }
        };
        state.send_replace(LifecycleState::Stopped);

        match startup_error {
            Some(source) => Err(OrchestratorError::StartupFetch { source, outcome }),
            None => Ok(outcome),
        }
    }
}

async fn fetch_task<St, F, Cl>(
    mut fetch: FetchCycle<St, F, Cl>,
    interval: Duration,
    cancel: CancellationToken,
    ready: oneshot::Sender<Result<FetchReport, FetchError>>,
) where
    St: ArticleStore + ?Sized + 'static,
    F: FeedSource + ?Sized + 'static,
    Cl: Clock + ?Sized,
{
    let mut ticker = Ticker::new(interval, FirstRun::Immediate, cancel);
    if !ticker.next().await {
        return;
    }

    let first = fetch.run().await;
    let failed = first.is_err();
    // The receiver is gone only when shutdown won the race
    let _ = ready.send(first);
    if failed {
        return;
    }

    while ticker.next().await {
        if let Err(error) = fetch.run().await {
            tracing::error!(error = %error, "Fetch cycle failed");
        }
    }
    tracing::info!("Fetch task stopped");
}

async fn publish_task<St, R, Sm, N>(
    publish: PublishCycle<St, R, Sm, N>,
    interval: Duration,
    cancel: CancellationToken,
) where
    St: ArticleStore + ?Sized,
    R: ContentResolver + ?Sized,
    Sm: Summarizer + ?Sized,
    N: Notifier + ?Sized,
{
    let mut ticker = Ticker::new(interval, FirstRun::Immediate, cancel);
    while ticker.next().await {
        let outcomes = publish.run().await;
        if !outcomes.is_empty() {
            let posted = outcomes.iter().filter(|(_, o)| o.is_posted()).count();
            tracing::info!(
                processed = outcomes.len(),
                posted,
                "Publish cycle complete"
            );
        }
    }
    tracing::info!("Publish task stopped");
}

async fn retention_task<St>(retention: RetentionCycle<St>, period: Duration, cancel: CancellationToken)
where
    St: ArticleStore + ?Sized,
{
    let mut ticker = Ticker::new(period, FirstRun::AfterPeriod, cancel);
    while ticker.next().await {
        match retention.run().await {
            Ok(deleted) => tracing::debug!(deleted, "Retention cycle finished"),
            // Already logged by the cycle; the next tick retries
            Err(_) => tracing::debug!("Retention cycle failed, retrying next period"),
        }
    }
    tracing::info!("Retention task stopped");
}
