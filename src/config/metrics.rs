//! Metrics configuration.

use super::defaults::{default_rolling_window_secs, default_session_window_size};
use serde::{Deserialize, Serialize};

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Number of most recent sessions averaged for the session-duration figure
    pub session_window_size: usize,
    /// Trailing window for the rolling event counters (seconds)
    pub rolling_window_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            session_window_size: default_session_window_size(),
            rolling_window_secs: default_rolling_window_secs(),
        }
    }
}
