//! courier CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::BoxMakeWriter, prelude::*};

mod args;
mod commands;
mod config;

/// Rotated log files kept next to `general.log_path`
const MAX_LOG_FILES: usize = 5;

use args::{Cli, Commands};
use config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Commands that need the config load it before logging so that
    // the `general.log_*` settings apply.
    let app_config = match &cli.command {
        Commands::Run(_) | Commands::Feeds(_) => Some(AppConfig::load(cli.config.as_deref())?),
        Commands::Config(_) | Commands::Doctor(_) => None,
    };

    let (log_level, log_format, log_path) = match &app_config {
        Some(config) => (
            cli.log_level
                .clone()
                .unwrap_or_else(|| config.general.log_level.clone()),
            config.general.log_format,
            config.general.log_path.as_deref(),
        ),
        None => (
            cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
            LogFormat::Text,
            None,
        ),
    };
    // Dropping the guard flushes buffered file output
    let _guard = init_logging(&log_level, log_format, log_path)?;

    match (cli.command, app_config) {
        (Commands::Run(args), Some(config)) => commands::run::execute(args, config).await,
        (Commands::Feeds(args), Some(config)) => {
            commands::feeds::execute(args, config).await?;
            Ok(ExitCode::SUCCESS)
        }
        (Commands::Config(args), _) => {
            commands::config::execute(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        (Commands::Doctor(args), _) => commands::doctor::execute(args, cli.config).await,
        (Commands::Run(_) | Commands::Feeds(_), None) => {
            anyhow::bail!("Configuration was not loaded")
        }
    }
}

fn init_logging(
    level: &str,
    format: LogFormat,
    log_path: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let (writer, guard, ansi) = match log_path {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling_appender(path)?);
            (BoxMakeWriter::new(writer), Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), None, true),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).init(),
    }

    Ok(guard)
}

/// Daily rolling appender writing `<name>.<date>` files beside `path`
fn rolling_appender(path: &Path) -> Result<RollingFileAppender> {
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid log file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}
