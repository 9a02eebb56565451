use tracing_appender::rolling::Rotation;
use tracing_subscriber::{fmt::time::UtcTime, layer::Identity, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: stdout plus an optional rolling file appender.
///
/// Level precedence is `logging.level` from config, then `RUST_LOG`, then `info`.
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_with_config(cfg: &LoggingConfig) {
    let env_filter = resolve_filter(cfg);

    match cfg.format {
        LogFormat::Json => init_json_logging(cfg, env_filter),
        LogFormat::Text => init_text_logging(cfg, env_filter),
    }
}

fn resolve_filter(cfg: &LoggingConfig) -> EnvFilter {
    match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn init_json_logging(cfg: &LoggingConfig, env_filter: EnvFilter) {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    let file_layer = cfg
        .enable_file_logging
        .then(|| {
            build_file_layer(cfg, |writer| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            })
        })
        .flatten();

    match file_layer {
        Some(layer) => {
            let _ = registry.with(layer).try_init();
        }
        None => {
            let _ = registry.with(Identity::new()).try_init();
        }
    }
}

fn init_text_logging(cfg: &LoggingConfig, env_filter: EnvFilter) {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    let file_layer = cfg
        .enable_file_logging
        .then(|| {
            build_file_layer(cfg, |writer| {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(writer)
            })
        })
        .flatten();

    match file_layer {
        Some(layer) => {
            let _ = registry.with(layer).try_init();
        }
        None => {
            let _ = registry.with(Identity::new()).try_init();
        }
    }
}

fn parse_rotation(raw: &str) -> Rotation {
    match raw.trim().to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn build_file_layer<F, L>(cfg: &LoggingConfig, build_layer: F) -> Option<L>
where
    F: FnOnce(tracing_appender::non_blocking::NonBlocking) -> L,
{
    if std::fs::create_dir_all(&cfg.dir).is_err() {
        eprintln!(
            "Failed to create log directory '{}', continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        parse_rotation(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // Keep guard alive for process lifetime
    let _leaked: &'static _ = Box::leak(Box::new(file_guard));

    Some(build_layer(non_blocking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn rotation_defaults_to_daily() {
        assert_eq!(parse_rotation("hourly"), Rotation::HOURLY);
        assert_eq!(parse_rotation(" NEVER "), Rotation::NEVER);
        assert_eq!(parse_rotation("weekly"), Rotation::DAILY);
    }

    #[test]
    fn configured_level_wins_over_environment() {
        let cfg = LoggingConfig {
            level: Some(LogLevel::Warn),
            ..LoggingConfig::default()
        };
        assert_eq!(resolve_filter(&cfg).to_string(), "warn");
    }

    #[test]
    fn init_is_idempotent_without_file_output() {
        let cfg = LoggingConfig {
            enable_file_logging: false,
            format: LogFormat::Text,
            ..LoggingConfig::default()
        };
        init_with_config(&cfg);
        init_with_config(&cfg);
    }
}
