//! WebSocket configuration types.

use super::defaults::{default_outbound_queue_capacity, default_ping_interval_secs};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Bounded per-connection outbound queue; messages beyond it are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Interval between protocol-level pings sent to each client (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outbound_queue_capacity == 0 {
            anyhow::bail!("websocket.outbound_queue_capacity must be at least 1");
        }
        if self.ping_interval_secs == 0 {
            anyhow::bail!("websocket.ping_interval_secs must be at least 1 second");
        }
        Ok(())
    }
}
