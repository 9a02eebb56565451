//! Configuration module for VoiceLink.
//!
//! Configuration is assembled from JSON documents (inline env var, stdin, files)
//! layered over compiled defaults, then patched by `VOICELINK__` environment
//! overrides.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Session timing, interest limits and sweep intervals
//! - [`security`]: CORS, frame size, per-IP caps and metrics auth
//! - [`logging`]: Logging configuration
//! - [`metrics`]: Metrics windows
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use metrics::MetricsConfig;

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::validate_config;

pub use websocket::WebSocketConfig;
