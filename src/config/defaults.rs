//! Default value functions for configuration fields.
//!
//! These back the `#[serde(default = ...)]` attributes throughout the
//! configuration types so that partial JSON documents fill in the gaps.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3000
}

// =============================================================================
// Session Defaults
// =============================================================================

pub const fn default_session_duration_secs() -> u64 {
    300 // 5 minutes
}

pub const fn default_extension_secs() -> u64 {
    300
}

pub const fn default_max_interests() -> usize {
    crate::protocol::DEFAULT_MAX_INTERESTS
}

pub const fn default_max_interest_length() -> usize {
    crate::protocol::DEFAULT_MAX_INTEREST_LENGTH
}

pub const fn default_expiry_sweep_interval_ms() -> u64 {
    500
}

pub const fn default_client_sweep_interval() -> u64 {
    15
}

pub const fn default_ping_timeout() -> u64 {
    60
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_require_metrics_auth() -> bool {
    false
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

// =============================================================================
// Metrics Defaults
// =============================================================================

pub const fn default_session_window_size() -> usize {
    100
}

pub const fn default_rolling_window_secs() -> u64 {
    3600 // 1 hour
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

pub const fn default_ping_interval_secs() -> u64 {
    20
}
