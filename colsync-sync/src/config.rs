//! Per-collection configuration.

use std::time::Duration;

/// Configuration for a synced collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// How long `wait_for_sync` waits for a confirming frame. `None` waits
    /// until the collection is disposed.
    pub wait_for_sync_timeout: Option<Duration>,
    /// Buffered change batches per subscriber before it starts lagging.
    pub change_channel_capacity: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            wait_for_sync_timeout: Some(Duration::from_millis(30_000)),
            change_channel_capacity: 256,
        }
    }
}

impl CollectionConfig {
    pub fn builder() -> CollectionConfigBuilder {
        CollectionConfigBuilder::new()
    }
}

/// Builder for [`CollectionConfig`].
pub struct CollectionConfigBuilder {
    config: CollectionConfig,
}

impl CollectionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CollectionConfig::default(),
        }
    }

    pub fn wait_for_sync_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_for_sync_timeout = Some(timeout);
        self
    }

    pub fn no_wait_for_sync_timeout(mut self) -> Self {
        self.config.wait_for_sync_timeout = None;
        self
    }

    pub fn change_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.change_channel_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> CollectionConfig {
        self.config
    }
}

impl Default for CollectionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
