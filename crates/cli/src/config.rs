//! Configuration loading and management

use anyhow::{Context, Result};
use courier_adapters::store::FeedSeed;
use courier_domain::usecases::{OrchestratorConfig, RETENTION_PERIOD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Feeds inserted into an empty database
    #[serde(default)]
    pub feeds: Vec<FeedSeed>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Write logs to this file (rotated daily) instead of stderr
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub fetch_interval_secs: u64,

    #[serde(default = "default_interval")]
    pub publish_interval_secs: u64,

    #[serde(default = "default_feed_cache_ttl")]
    pub feed_cache_ttl_secs: u64,

    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Channel username (`@name`) or numeric chat id
    #[serde(default)]
    pub channel_id: String,

    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_database_path() -> PathBuf {
    PathBuf::from("./courier.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval() -> u64 {
    30 * 60
}

fn default_feed_cache_ttl() -> u64 {
    60 * 60
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_max_age_days() -> u32 {
    1
}

fn default_content_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("courier/{}", env!("CARGO_PKG_VERSION"))
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout() -> u64 {
    45
}

fn default_llm_retries() -> u32 {
    2
}

fn default_max_output_tokens() -> u32 {
    125
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_path: None,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_interval(),
            publish_interval_secs: default_interval(),
            feed_cache_ttl_secs: default_feed_cache_ttl(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_content_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            retries: default_llm_retries(),
            max_output_tokens: default_max_output_tokens(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_api_key_env(),
            base_url: default_anthropic_base_url(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            channel_id: String::new(),
            base_url: default_telegram_base_url(),
        }
    }
}

impl ScheduleConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            fetch_interval: Duration::from_secs(self.fetch_interval_secs),
            publish_interval: Duration::from_secs(self.publish_interval_secs),
            retention_period: RETENTION_PERIOD,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }

    pub fn feed_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_cache_ttl_secs)
    }
}

impl LlmConfig {
    /// Settings shared by every summarizer adapter
    pub fn adapter_config(&self) -> courier_adapters::llm::LlmConfig {
        courier_adapters::llm::LlmConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            timeout_secs: self.timeout_secs,
            retries: self.retries,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("COURIER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# courier configuration

[general]
database_path = "./courier.sqlite"
log_level = "info"
log_format = "text"  # text, json
# Rotated daily, 5 files kept; logs go to stderr when unset
# log_path = "./logs/courier.log"

[schedule]
fetch_interval_secs = 1800
publish_interval_secs = 1800
feed_cache_ttl_secs = 3600
shutdown_grace_secs = 30

[retention]
# Posted articles older than this are deleted once a day
max_age_days = 1

[content]
timeout_secs = 30
# user_agent = "courier/0.1.0"

[llm]
provider = "openai"  # openai, anthropic, ollama, stub
model = "gpt-4o-mini"
temperature = 0.7
timeout_secs = 45
retries = 2
max_output_tokens = 125

[llm.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[llm.anthropic]
api_key_env = "ANTHROPIC_API_KEY"
base_url = "https://api.anthropic.com"

[llm.ollama]
base_url = "http://localhost:11434"

[telegram]
bot_token_env = "TELEGRAM_BOT_TOKEN"
channel_id = "@your_channel"
base_url = "https://api.telegram.org"

# Seeded into the database on first start only
[[feeds]]
name = "Hacker News"
url = "https://news.ycombinator.com/rss"

[[feeds]]
name = "Lobsters"
url = "https://lobste.rs/rss"
"#
        .to_string()
    }
}
