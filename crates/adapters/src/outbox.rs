//! Outbox notifier for require-approval mode.
//!
//! Messages are appended to a JSONL file for a human to review and forward
//! instead of going straight to the channel.

use async_trait::async_trait;
use courier_domain::model::RenderedMessage;
use courier_domain::ports::{Notifier, NotifyError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::telegram::render_markdown_v2;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    writer: OutboxWriter,
}

impl OutboxNotifier {
    pub fn new(writer: OutboxWriter) -> Self {
        Self { writer }
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    queued_at: OffsetDateTime,
    article_id: i64,
    link: &'a str,
    text: String,
    markdown_v2: String,
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError> {
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            queued_at: OffsetDateTime::now_utc(),
            article_id: message.article_id,
            link: &message.link,
            text: message.plain_text(),
            markdown_v2: render_markdown_v2(message),
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| NotifyError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(
            article_id = message.article_id,
            outbox = %self.writer.path().display(),
            "Queued message for approval"
        );
        Ok(())
    }

    fn destination(&self) -> &'static str {
        "outbox"
    }
}
