//! SQLite article store implementation

use async_trait::async_trait;
use courier_domain::{
    Article, ArticleStore, Clock, Feed, NewArticle, StorageError, SystemClock,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::store::FeedSeed;

type ArticleRow = (i64, i64, String, String, String, i64, Option<i64>);

/// SQLite-backed article store
pub struct SqliteArticleStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteArticleStore {
    /// Open (or create) the database at `db_path` and apply the schema
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Use `clock` for posted timestamps and the retention cutoff
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                summary TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                posted_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_unposted
            ON articles(posted_at, published_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    /// Insert the configured feeds, but only into an empty feeds table.
    /// Returns the number of feeds inserted.
    pub async fn seed_feeds(&self, seeds: &[FeedSeed]) -> Result<usize, StorageError> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if existing > 0 {
            tracing::debug!(existing, "Feeds table already populated, skipping seed");
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut inserted = 0;
        for seed in seeds {
            let result =
                sqlx::query("INSERT INTO feeds (name, url) VALUES (?, ?) ON CONFLICT(url) DO NOTHING")
                    .bind(&seed.name)
                    .bind(&seed.url)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        tracing::info!(inserted, "Seeded feeds");
        Ok(inserted)
    }
}

fn from_unix(seconds: i64) -> Result<OffsetDateTime, StorageError> {
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn article_from_row(row: ArticleRow) -> Result<Article, StorageError> {
    let (id, feed_id, title, link, summary, published_at, posted_at) = row;
    Ok(Article {
        id,
        feed_id,
        title,
        link,
        summary,
        published_at: from_unix(published_at)?,
        posted_at: posted_at.map(from_unix).transpose()?,
    })
}

#[async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn list_feeds(&self) -> Result<Vec<Feed>, StorageError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, url FROM feeds ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, url)| Feed { id, name, url })
            .collect())
    }

    async fn insert_article_if_absent(&self, article: &NewArticle) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (feed_id, title, link, summary, published_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(article.feed_id)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(article.published_at.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_unposted_articles(&self) -> Result<Vec<Article>, StorageError> {
        let rows: Vec<ArticleRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, link, summary, published_at, posted_at
            FROM articles
            WHERE posted_at IS NULL
            ORDER BY published_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.into_iter().map(article_from_row).collect()
    }

    async fn mark_posted(&self, article_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE articles SET posted_at = ? WHERE id = ? AND posted_at IS NULL")
            .bind(self.clock.now().unix_timestamp())
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_posted_older_than(&self, days: u32) -> Result<u64, StorageError> {
        let cutoff = self.clock.now() - time::Duration::days(i64::from(days));

        let result =
            sqlx::query("DELETE FROM articles WHERE posted_at IS NOT NULL AND posted_at < ?")
                .bind(cutoff.unix_timestamp())
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
