//! Telegram Bot API notifier

use async_trait::async_trait;
use courier_domain::{Notifier, NotifyError, RenderedMessage};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters that must be escaped anywhere in MarkdownV2 text
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escape `text` for use as plain text inside a MarkdownV2 message
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bold title, plain body, plain link
pub fn render_markdown_v2(message: &RenderedMessage) -> String {
    format!(
        "*{}*{}\n\n{}",
        escape_markdown_v2(&message.title),
        escape_markdown_v2(&message.body),
        escape_markdown_v2(&message.link)
    )
}

/// Posts messages to one channel through `sendMessage`
pub struct TelegramNotifier {
    client: Client,
    bot_token: SecretString,
    channel_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, bot_token: SecretString, channel_id: String) -> Self {
        Self::with_base_url(
            client,
            bot_token,
            channel_id,
            "https://api.telegram.org".to_string(),
        )
    }

    pub fn with_base_url(
        client: Client,
        bot_token: SecretString,
        channel_id: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            bot_token,
            channel_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }

    /// Verify the bot token with `getMe`, returning the bot's username
    pub async fn check(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let envelope: ApiResponse<BotUser> = parse_envelope(response).await?;
        envelope
            .result
            .map(|user| user.username.unwrap_or_default())
            .ok_or_else(|| NotifyError::Api("getMe returned no result".to_string()))
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Map Telegram's response envelope onto the notifier error taxonomy
async fn parse_envelope<T>(response: reqwest::Response) -> Result<ApiResponse<T>, NotifyError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if status == 401 {
        return Err(NotifyError::Auth("Invalid bot token".to_string()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

    let envelope: ApiResponse<T> = serde_json::from_str(&body)
        .map_err(|_| NotifyError::Api(format!("Unexpected response ({}): {}", status, body)))?;

    if status == 429 {
        let retry_after = envelope
            .parameters
            .as_ref()
            .and_then(|p| p.retry_after)
            .map(Duration::from_secs);
        return Err(NotifyError::RateLimited(retry_after));
    }

    if !envelope.ok {
        return Err(NotifyError::Api(
            envelope
                .description
                .unwrap_or_else(|| format!("Request failed with status {}", status)),
        ));
    }

    Ok(envelope)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            chat_id: &self.channel_id,
            text: render_markdown_v2(message),
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let envelope: ApiResponse<SentMessage> = parse_envelope(response).await?;
        if let Some(sent) = envelope.result {
            tracing::debug!(
                article_id = message.article_id,
                message_id = sent.message_id,
                "Telegram accepted message"
            );
        }

        Ok(())
    }

    fn destination(&self) -> &'static str {
        "telegram"
    }
}
