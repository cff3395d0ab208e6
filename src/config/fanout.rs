//! Denormalization fan-out configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    /// Trips repaired in parallel for one profile
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Pending fan-out jobs before enqueueing fails
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Delay before re-running a pass that left stragglers
    #[serde(default = "default_repair_delay_ms")]
    pub repair_delay_ms: u64,

    /// Follow-up passes after the first before giving up
    #[serde(default = "default_max_repair_passes")]
    pub max_repair_passes: u32,
}

impl FanoutConfig {
    pub fn repair_delay(&self) -> Duration {
        Duration::from_millis(self.repair_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrency == 0 {
            return Err(ValidationError::ZeroValue("fanout.max_concurrency"));
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::ZeroValue("fanout.queue_capacity"));
        }
        Ok(())
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            queue_capacity: default_queue_capacity(),
            repair_delay_ms: default_repair_delay_ms(),
            max_repair_passes: default_max_repair_passes(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_repair_delay_ms() -> u64 {
    2000
}

fn default_max_repair_passes() -> u32 {
    5
}
