//! Construction-time parameters handed to every backend factory.

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Parameters a backend is built with. Read-only once the device exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Transfer unit in bytes. Must be a power of two.
    pub block_size: usize,
    /// Maximum queued requests per worker.
    pub queue_depth: usize,
    /// Submit each block as its own request instead of batching per worker.
    pub single_submit: bool,
    /// Allow a new asynchronous operation to start before earlier ones finish.
    pub overlap_events: bool,
    /// Number of I/O worker threads.
    pub thread_count: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            block_size: 1024 * 1024,
            queue_depth: 128,
            single_submit: false,
            overlap_events: true,
            thread_count: 1,
        }
    }
}

impl DeviceSettings {
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(DeviceError::InvalidSettings(format!(
                "block_size must be a non-zero power of two, got {}",
                self.block_size
            )));
        }
        if self.queue_depth == 0 {
            return Err(DeviceError::InvalidSettings(
                "queue_depth must be positive".to_string(),
            ));
        }
        if self.thread_count == 0 {
            return Err(DeviceError::InvalidSettings(
                "thread_count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
