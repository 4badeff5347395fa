//! Sync engine configuration

use std::time::Duration;

/// Configuration for the sync engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of queue items dispatched concurrently per batch
    pub batch_size: usize,
    /// Retry budget before a failure is classified as terminal or conflict
    pub max_retries: u32,
    /// Periodic sync interval while online (default: 30 seconds)
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            sync_interval: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Set the batch size (clamped to at least 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the retry budget (clamped to at least 1)
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the periodic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }
}
