//! Retention cycle - purges articles that were posted long enough ago

use std::sync::Arc;
use std::time::Duration;

use crate::ports::{ArticleStore, StorageError};

/// How often the retention cycle runs. The first run happens one full period
/// after startup.
pub const RETENTION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RetentionCycle<St: ArticleStore + ?Sized> {
    store: Arc<St>,
    max_age_days: u32,
}

impl<St: ArticleStore + ?Sized> RetentionCycle<St> {
    pub fn new(store: Arc<St>, max_age_days: u32) -> Self {
        Self {
            store,
            max_age_days,
        }
    }

    /// Delete posted articles older than the configured age. Unposted articles
    /// are never touched.
    pub async fn run(&self) -> Result<u64, StorageError> {
        match self.store.delete_posted_older_than(self.max_age_days).await {
            Ok(deleted) => {
                tracing::info!(
                    deleted,
                    max_age_days = self.max_age_days,
                    "Removed old posted articles"
                );
                Ok(deleted)
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to remove old posted articles");
                Err(error)
            }
        }
    }
}
