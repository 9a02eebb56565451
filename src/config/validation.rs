//! Configuration validation functions.

use super::Config;

/// Reject configurations the server cannot run with.
///
/// Warnings for risky but workable settings are printed to stderr since
/// validation runs before logging is initialized.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let server = &config.server;

    if server.session_duration_secs == 0 {
        anyhow::bail!("server.session_duration_secs must be greater than zero");
    }
    if server.extension_secs == 0 {
        anyhow::bail!("server.extension_secs must be greater than zero");
    }
    if server.max_interests == 0 {
        anyhow::bail!("server.max_interests must be at least 1");
    }
    if server.max_interest_length == 0 {
        anyhow::bail!("server.max_interest_length must be at least 1");
    }
    if server.expiry_sweep_interval_ms == 0 {
        anyhow::bail!("server.expiry_sweep_interval_ms must be greater than zero");
    }
    if server.client_sweep_interval == 0 {
        anyhow::bail!("server.client_sweep_interval must be greater than zero");
    }
    if server.ping_timeout == 0 {
        anyhow::bail!("server.ping_timeout must be greater than zero");
    }
    if config.websocket.ping_interval_secs >= server.ping_timeout {
        eprintln!(
            "WARNING: websocket.ping_interval_secs ({}) is not below server.ping_timeout ({}); \
             idle clients may be evicted between pings",
            config.websocket.ping_interval_secs, server.ping_timeout
        );
    }

    if config.security.max_message_size == 0 {
        anyhow::bail!("security.max_message_size must be greater than zero");
    }
    if config.security.max_connections_per_ip == 0 {
        anyhow::bail!("security.max_connections_per_ip must be at least 1");
    }

    if config.security.require_metrics_auth {
        let token_present = config
            .security
            .metrics_auth_token
            .as_ref()
            .is_some_and(|t| !t.is_empty());

        if !token_present {
            anyhow::bail!(
                "Metrics authentication is enabled but no token is configured. \
                 Set VOICELINK__SECURITY__METRICS_AUTH_TOKEN or disable \
                 VOICELINK__SECURITY__REQUIRE_METRICS_AUTH"
            );
        }

        if let Some(token) = &config.security.metrics_auth_token {
            if token.len() < 16 {
                eprintln!(
                    "WARNING: Metrics auth token is very short ({} chars); use at least 32",
                    token.len()
                );
            }
        }
    }

    if config.metrics.session_window_size == 0 {
        anyhow::bail!("metrics.session_window_size must be at least 1");
    }
    if config.metrics.rolling_window_secs == 0 {
        anyhow::bail!("metrics.rolling_window_secs must be greater than zero");
    }

    config.websocket.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let mut config = Config::default();
        config.server.session_duration_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.extension_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn interest_cap_of_zero_is_rejected() {
        let mut config = Config::default();
        config.server.max_interests = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_interests"));
    }

    #[test]
    fn metrics_auth_requires_a_token() {
        let mut config = Config::default();
        config.security.require_metrics_auth = true;
        assert!(validate_config(&config).is_err());

        config.security.metrics_auth_token = Some("0123456789abcdef0123456789abcdef".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
