use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every relayed turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Pause/resume cycles allowed per run before it is failed
    pub max_tool_rounds: usize,
    /// Wall-clock budget for the whole request
    pub request_timeout: Duration,
    /// Capacity of the event channel between relay task and client
    pub event_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            request_timeout: Duration::from_secs(60),
            event_buffer: 256,
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}
