//! Command implementations

pub mod config;
pub mod doctor;
pub mod feeds;
pub mod run;

use anyhow::{Context, Result};
use courier_adapters::llm::{
    AnthropicSummarizer, OllamaSummarizer, OpenAiSummarizer, StubSummarizer,
};
use courier_adapters::store::SqliteArticleStore;
use courier_domain::Summarizer;
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::AppConfig;

/// Read a secret from the env var named in the config
pub(crate) fn load_secret(env_var: &str, what: &str) -> Result<SecretString> {
    if env_var.is_empty() {
        anyhow::bail!("No env var configured for {}", what);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("{} env var {} is not set", what, env_var))?;
    if value.is_empty() {
        anyhow::bail!("{} env var {} is empty", what, env_var);
    }

    Ok(SecretString::new(value.into()))
}

pub(crate) fn build_summarizer(config: &AppConfig) -> Result<Arc<dyn Summarizer>> {
    let llm = &config.llm;
    let adapter_config = llm.adapter_config();

    let summarizer: Arc<dyn Summarizer> = match llm.provider.as_str() {
        "openai" => {
            let api_key = load_secret(&llm.openai.api_key_env, "OpenAI API key")?;
            Arc::new(OpenAiSummarizer::with_base_url(
                api_key,
                llm.openai.base_url.clone(),
                adapter_config,
            )?)
        }
        "anthropic" => {
            let api_key = load_secret(&llm.anthropic.api_key_env, "Anthropic API key")?;
            Arc::new(AnthropicSummarizer::with_base_url(
                api_key,
                llm.anthropic.base_url.clone(),
                adapter_config,
            )?)
        }
        "ollama" => Arc::new(OllamaSummarizer::with_base_url(
            llm.ollama.base_url.clone(),
            adapter_config,
        )?),
        "stub" => Arc::new(StubSummarizer::default()),
        other => anyhow::bail!(
            "Unknown LLM provider: {} (expected openai, anthropic, ollama or stub)",
            other
        ),
    };

    tracing::info!(provider = %llm.provider, model = %llm.model, "Summarizer ready");
    Ok(summarizer)
}

/// Open the database and apply the configured feed seeds
pub(crate) async fn open_store(config: &AppConfig) -> Result<SqliteArticleStore> {
    let path = &config.general.database_path;
    let store = SqliteArticleStore::new(path)
        .await
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    let seeded = store
        .seed_feeds(&config.feeds)
        .await
        .context("Failed to seed feeds")?;
    if seeded > 0 {
        tracing::info!(count = seeded, "Seeded feeds into empty database");
    }

    Ok(store)
}
