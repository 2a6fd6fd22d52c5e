//! Storage and write-pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Configuration for the profile store and its batch writer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Work queue capacity. Producers block when it is full. Default: 128.
    pub queue_capacity: Option<usize>,
    /// Staged items per transaction before the writer commits. Default: 50.
    pub batch_size: Option<usize>,
    /// How long `commit()` waits for the queue to drain before swapping
    /// writers anyway. Default: 2400ms.
    pub commit_drain_timeout_ms: Option<u64>,
    /// Poll interval while `commit()` waits for the queue. Default: 100ms.
    pub commit_poll_interval_ms: Option<u64>,
    /// Upper bound on a blocked enqueue. None (default) blocks until space
    /// frees or the store shuts down.
    pub enqueue_timeout_ms: Option<u64>,
    /// SQLite busy timeout for every connection. Default: 5000ms.
    pub busy_timeout_ms: Option<u64>,
    /// Prepared statement cache size per writer connection. Default: 32.
    pub statement_cache_capacity: Option<usize>,
}

impl StorageConfig {
    /// Returns the effective queue capacity, defaulting to 128.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(128).max(1)
    }

    /// Returns the effective batch size, defaulting to 50.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(50).max(1)
    }

    pub fn effective_commit_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_drain_timeout_ms.unwrap_or(2400))
    }

    pub fn effective_commit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.commit_poll_interval_ms.unwrap_or(100).max(1))
    }

    pub fn effective_enqueue_timeout(&self) -> Option<Duration> {
        self.enqueue_timeout_ms.map(Duration::from_millis)
    }

    pub fn effective_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.unwrap_or(5000))
    }

    /// Never smaller than the statements a writer keeps warm.
    pub fn effective_statement_cache_capacity(&self) -> usize {
        self.statement_cache_capacity.unwrap_or(32).max(16)
    }

    /// Reject values that would deadlock or disable the writer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "storage.queue_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "storage.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pipeline() {
        let config = StorageConfig::default();
        assert_eq!(config.effective_queue_capacity(), 128);
        assert_eq!(config.effective_batch_size(), 50);
        assert_eq!(config.effective_commit_drain_timeout(), Duration::from_millis(2400));
        assert_eq!(config.effective_commit_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.effective_enqueue_timeout(), None);
    }

    #[test]
    fn statement_cache_never_below_warm_set() {
        let config = StorageConfig {
            statement_cache_capacity: Some(2),
            ..Default::default()
        };
        assert_eq!(config.effective_statement_cache_capacity(), 16);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = StorageConfig {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
