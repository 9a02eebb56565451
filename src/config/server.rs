//! Session timing and matchmaking configuration types.

use super::defaults::{
    default_client_sweep_interval, default_expiry_sweep_interval_ms, default_extension_secs,
    default_max_interest_length, default_max_interests, default_ping_timeout,
    default_session_duration_secs,
};
use serde::{Deserialize, Serialize};

/// Server configuration for rooms, matchmaking and liveness.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Initial length of a room (seconds)
    #[serde(default = "default_session_duration_secs")]
    pub session_duration_secs: u64,
    /// Time added when both partners agree to extend (seconds)
    #[serde(default = "default_extension_secs")]
    pub extension_secs: u64,
    /// Maximum number of distinct interests per participant
    #[serde(default = "default_max_interests")]
    pub max_interests: usize,
    /// Maximum length of a single interest (characters)
    #[serde(default = "default_max_interest_length")]
    pub max_interest_length: usize,
    /// How often rooms are checked for an elapsed deadline (milliseconds)
    #[serde(default = "default_expiry_sweep_interval_ms")]
    pub expiry_sweep_interval_ms: u64,
    /// How often idle connections are evicted (seconds)
    #[serde(default = "default_client_sweep_interval")]
    pub client_sweep_interval: u64,
    /// Connections silent for longer than this are dropped (seconds)
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_duration_secs: default_session_duration_secs(),
            extension_secs: default_extension_secs(),
            max_interests: default_max_interests(),
            max_interest_length: default_max_interest_length(),
            expiry_sweep_interval_ms: default_expiry_sweep_interval_ms(),
            client_sweep_interval: default_client_sweep_interval(),
            ping_timeout: default_ping_timeout(),
        }
    }
}
