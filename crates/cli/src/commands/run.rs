//! Run command - fetch feeds and publish summaries

use anyhow::{Context, Result};
use courier_adapters::{
    content::HttpContentResolver,
    feeds::HttpFeedSource,
    http_client,
    outbox::{OutboxNotifier, OutboxWriter},
    telegram::TelegramNotifier,
};
use courier_domain::{
    ArticleOutcome, Notifier, SystemClock,
    usecases::{
        FetchCycle, Orchestrator, OrchestratorError, PublishConfig, PublishCycle, RetentionCycle,
        ShutdownOutcome,
    },
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{build_summarizer, load_secret, open_store};
use crate::args::RunArgs;
use crate::config::AppConfig;

/// Exit code when in-flight work outlived the shutdown grace period
const FORCED_SHUTDOWN_EXIT: u8 = 2;

pub async fn execute(args: RunArgs, config: AppConfig) -> Result<ExitCode> {
    let outbox_path = if args.require_approval {
        Some(args.outbox.clone().unwrap_or_else(default_outbox_path))
    } else {
        None
    };

    if args.outbox.is_some() && !args.require_approval {
        tracing::warn!("--outbox is ignored without --require-approval");
    }

    tracing::info!(
        once = args.once,
        require_approval = args.require_approval,
        database = %config.general.database_path.display(),
        feeds_seeded = config.feeds.len(),
        "Starting courier"
    );

    let store = Arc::new(open_store(&config).await?);

    let client = http_client(
        Duration::from_secs(config.content.timeout_secs),
        &config.content.user_agent,
    )
    .context("Failed to build HTTP client")?;
    let feed_source = Arc::new(HttpFeedSource::new(client.clone()));
    let resolver = Arc::new(HttpContentResolver::new(client.clone()));
    let summarizer = build_summarizer(&config)?;

    let notifier: Arc<dyn Notifier> = match outbox_path {
        Some(path) => {
            let writer = OutboxWriter::new(path.clone())
                .await
                .context("Failed to initialize outbox writer")?;
            tracing::info!(outbox = %path.display(), "Writing messages to outbox for approval");
            Arc::new(OutboxNotifier::new(writer))
        }
        None => {
            let telegram = &config.telegram;
            if telegram.channel_id.trim().is_empty() {
                anyhow::bail!(
                    "telegram.channel_id is not configured (or use --require-approval)"
                );
            }
            let bot_token = load_secret(&telegram.bot_token_env, "Telegram bot token")?;
            Arc::new(TelegramNotifier::with_base_url(
                client,
                bot_token,
                telegram.channel_id.clone(),
                telegram.base_url.clone(),
            ))
        }
    };

    let fetch = FetchCycle::new(
        store.clone(),
        feed_source,
        Arc::new(SystemClock),
        config.schedule.feed_cache_ttl(),
    );
    let publish = PublishCycle::new(
        store.clone(),
        resolver,
        summarizer,
        notifier,
        PublishConfig::default(),
    );
    let retention = RetentionCycle::new(store, config.retention.max_age_days);
    let orchestrator = Orchestrator::new(
        fetch,
        publish,
        retention,
        config.schedule.orchestrator_config(),
    );

    if args.once {
        let (_, outcomes) = orchestrator
            .run_once()
            .await
            .context("Fetch cycle failed")?;
        report_once(&outcomes);
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    match orchestrator.run(shutdown).await {
        Ok(ShutdownOutcome::Graceful) => Ok(ExitCode::SUCCESS),
        Ok(ShutdownOutcome::Forced) => Ok(ExitCode::from(FORCED_SHUTDOWN_EXIT)),
        Err(error @ OrchestratorError::StartupFetch { .. }) => Err(error.into()),
    }
}

fn report_once(outcomes: &[(i64, ArticleOutcome)]) {
    for (article_id, outcome) in outcomes {
        match outcome {
            ArticleOutcome::Posted => {
                tracing::info!(article_id, "Posted");
            }
            ArticleOutcome::PostedUnrecorded { error } => {
                tracing::warn!(article_id, error = %error, "Posted but not recorded");
            }
            ArticleOutcome::SummaryFailed { error } => {
                tracing::warn!(article_id, error = %error, "Summary failed");
            }
            ArticleOutcome::DeliveryFailed { error } => {
                tracing::error!(article_id, error = %error, "Delivery failed");
            }
            ArticleOutcome::Cancelled => {
                tracing::debug!(article_id, "Cancelled");
            }
        }
    }

    let posted = outcomes.iter().filter(|(_, o)| o.is_posted()).count();
    tracing::info!(
        posted,
        pending = outcomes.len() - posted,
        "Publish cycle complete"
    );
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}
