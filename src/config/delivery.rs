//! Live delivery configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::websocket::ConnectionSettings;

/// Per-connection delivery tuning
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Messages buffered per connection before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Deadline for writing one frame, in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

impl DeliveryConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            queue_capacity: self.outbound_queue_capacity,
            write_timeout: self.write_timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=10_000).contains(&self.outbound_queue_capacity) {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if !(1..=120).contains(&self.write_timeout_secs) {
            return Err(ValidationError::InvalidWriteTimeout);
        }
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_queue_capacity(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

fn default_write_timeout() -> u64 {
    10
}
