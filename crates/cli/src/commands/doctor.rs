//! Doctor command - validate configuration and show status

use anyhow::Result;
use courier_domain::ArticleStore;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use super::open_store;
use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    llm: CheckResult,
    telegram: CheckResult,
    overall: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Warn,
    Error,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Status::Ok => "✓",
            Status::Warn => "⚠",
            Status::Error => "✗",
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: Status,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warn, message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let not_checked = || CheckResult::error("Not checked");
    let mut report = DoctorReport {
        config: not_checked(),
        database: not_checked(),
        llm: not_checked(),
        telegram: not_checked(),
        overall: Status::Error,
    };

    match AppConfig::load(config_path.as_deref()) {
        Ok(config) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            report.database = check_database(&config).await;
            report.llm = check_llm(&config);
            report.telegram = check_telegram(&config);
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
        }
    }

    let checks = [
        &report.config,
        &report.database,
        &report.llm,
        &report.telegram,
    ];
    report.overall = checks
        .iter()
        .map(|check| check.status)
        .max_by_key(|status| match status {
            Status::Ok => 0,
            Status::Warn => 1,
            Status::Error => 2,
        })
        .unwrap_or(Status::Ok);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.overall == Status::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn check_database(config: &AppConfig) -> CheckResult {
    let path = &config.general.database_path;
    let store = match open_store(config).await {
        Ok(store) => store,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match store.list_feeds().await {
        Ok(feeds) if feeds.is_empty() => CheckResult::warn(format!(
            "Database {} has no feeds; add [[feeds]] entries to the config",
            path.display()
        )),
        Ok(feeds) => CheckResult::ok(format!(
            "Database {} with {} feeds",
            path.display(),
            feeds.len()
        ))
        .with_details(serde_json::json!({
            "feeds": feeds.iter().map(|f| &f.url).collect::<Vec<_>>()
        })),
        Err(e) => CheckResult::error(format!("Failed to list feeds: {}", e)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let provider = &config.llm.provider;
    let model = &config.llm.model;

    // Only report whether the key is set, never its value
    let api_key_env = match provider.as_str() {
        "openai" => &config.llm.openai.api_key_env,
        "anthropic" => &config.llm.anthropic.api_key_env,
        "ollama" => {
            return CheckResult::ok(format!(
                "Provider: ollama, Model: {}, base_url: {}",
                model, config.llm.ollama.base_url
            ));
        }
        "stub" => return CheckResult::ok("Provider: stub (offline)"),
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    if env_is_set(api_key_env) {
        CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        ))
    } else {
        CheckResult::warn(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        ))
    }
}

fn check_telegram(config: &AppConfig) -> CheckResult {
    let telegram = &config.telegram;

    if telegram.channel_id.trim().is_empty() {
        return CheckResult::warn("No channel_id configured (only --require-approval will work)");
    }

    if telegram.bot_token_env.is_empty() {
        return CheckResult::error("No bot token env var configured");
    }

    if env_is_set(&telegram.bot_token_env) {
        CheckResult::ok(format!(
            "Channel: {}, Bot token: {} (set)",
            telegram.channel_id, telegram.bot_token_env
        ))
    } else {
        CheckResult::warn(format!(
            "Channel: {}, Bot token: {} (not set)",
            telegram.channel_id, telegram.bot_token_env
        ))
    }
}

fn env_is_set(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| !value.is_empty())
}

fn print_report(report: &DoctorReport) {
    println!("courier Doctor Report");
    println!("=====================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("LLM Provider", &report.llm);
    print_check("Telegram", &report.telegram);

    println!();
    let overall = format!("{:?}", report.overall).to_uppercase();
    println!("{} Overall: {}", report.overall.symbol(), overall);

    if report.overall == Status::Ok {
        println!();
        println!("Ready to run! Try: courier run --once --require-approval");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", result.status.symbol(), name, result.message);
}
