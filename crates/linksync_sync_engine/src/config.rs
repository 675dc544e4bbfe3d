//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for reconciliation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum time between two runs when nothing is pending.
    pub min_sync_interval: Duration,
    /// Minimum time between two bulk reads of the remote store.
    pub remote_load_interval: Duration,
    /// Period of the automatic trigger; `None` disables it.
    pub sync_interval: Option<Duration>,
    /// Capacity of the sync log.
    pub max_log_entries: usize,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            min_sync_interval: Duration::from_secs(5),
            remote_load_interval: Duration::from_secs(300),
            sync_interval: Some(Duration::from_secs(300)),
            max_log_entries: 100,
        }
    }

    /// Sets the throttle interval.
    pub fn with_min_sync_interval(mut self, interval: Duration) -> Self {
        self.min_sync_interval = interval;
        self
    }

    /// Sets the remote bulk-read interval.
    pub fn with_remote_load_interval(mut self, interval: Duration) -> Self {
        self.remote_load_interval = interval;
        self
    }

    /// Sets the automatic sync period.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Disables the automatic trigger.
    pub fn without_sync_interval(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    /// Sets the sync log capacity.
    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.min_sync_interval, Duration::from_secs(5));
        assert!(config.remote_load_interval > config.min_sync_interval);
        assert_eq!(config.sync_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.max_log_entries, 100);
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_min_sync_interval(Duration::ZERO)
            .with_remote_load_interval(Duration::from_secs(60))
            .without_sync_interval()
            .with_max_log_entries(10);

        assert_eq!(config.min_sync_interval, Duration::ZERO);
        assert_eq!(config.remote_load_interval, Duration::from_secs(60));
        assert!(config.sync_interval.is_none());
        assert_eq!(config.max_log_entries, 10);
    }
}
