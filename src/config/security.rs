//! Security and admission configuration types.

use super::defaults::{
    default_cors_origins, default_max_connections_per_ip, default_max_message_size,
    default_require_metrics_auth,
};
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Enable bearer authentication for the metrics endpoints
    #[serde(default = "default_require_metrics_auth")]
    pub require_metrics_auth: bool,
    /// Bearer token for the metrics endpoints (if required)
    #[serde(default)]
    pub metrics_auth_token: Option<String>,
    /// Maximum WebSocket message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum connections per IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            require_metrics_auth: default_require_metrics_auth(),
            metrics_auth_token: None,
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
        }
    }
}

impl SecurityConfig {
    /// Parsed origin list; `None` means any origin is allowed.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            None
        } else {
            Some(origins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_or_blank_allows_any_origin() {
        let config = SecurityConfig::default();
        assert!(config.allowed_origins().is_none());

        let blank = SecurityConfig {
            cors_origins: " , ".to_string(),
            ..SecurityConfig::default()
        };
        assert!(blank.allowed_origins().is_none());
    }

    #[test]
    fn explicit_origins_are_trimmed() {
        let config = SecurityConfig {
            cors_origins: "https://a.example, https://b.example".to_string(),
            ..SecurityConfig::default()
        };
        assert_eq!(
            config.allowed_origins(),
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }
}
