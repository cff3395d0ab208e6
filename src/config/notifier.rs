//! Change notifier configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Buffered pushes per subscriber
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Idle seconds before a subscriber is reaped
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,

    /// Seconds between reaper sweeps
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,

    /// Out-of-order pushes held per trip before flushing
    #[serde(default = "default_max_pending_reorder")]
    pub max_pending_reorder: usize,

    /// Milliseconds a version gap may stay open before it is flushed
    #[serde(default = "default_max_reorder_wait_ms")]
    pub max_reorder_wait_ms: u64,
}

impl NotifierConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn max_reorder_wait(&self) -> Duration {
        Duration::from_millis(self.max_reorder_wait_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 {
            return Err(ValidationError::ZeroValue("notifier.channel_capacity"));
        }
        if self.reap_interval_secs == 0 {
            return Err(ValidationError::ZeroValue("notifier.reap_interval_secs"));
        }
        if self.max_reorder_wait_ms == 0 {
            return Err(ValidationError::ZeroValue("notifier.max_reorder_wait_ms"));
        }
        if self.liveness_timeout_secs < self.reap_interval_secs {
            return Err(ValidationError::LivenessShorterThanReap);
        }
        Ok(())
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            max_pending_reorder: default_max_pending_reorder(),
            max_reorder_wait_ms: default_max_reorder_wait_ms(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_liveness_timeout_secs() -> u64 {
    60
}

fn default_reap_interval_secs() -> u64 {
    15
}

fn default_max_pending_reorder() -> usize {
    64
}

fn default_max_reorder_wait_ms() -> u64 {
    2_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NotifierConfig::default();
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.liveness_timeout(), Duration::from_secs(60));
        assert_eq!(config.reap_interval(), Duration::from_secs(15));
        assert_eq!(config.max_pending_reorder, 64);
        assert_eq!(config.max_reorder_wait(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn liveness_must_cover_reap_interval() {
        let config = NotifierConfig {
            liveness_timeout_secs: 5,
            reap_interval_secs: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::LivenessShorterThanReap)
        ));
    }
}
