#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use std::net::SocketAddr;
use voicelink_server::config;
use voicelink_server::logging;
use voicelink_server::server::ServerConfig;
use voicelink_server::websocket;

/// VoiceLink -- anonymous voice matchmaking and WebRTC signaling server
#[derive(Parser, Debug)]
#[command(name = "voicelink-server")]
#[command(about = "Anonymous one-to-one voice matchmaking with WebRTC signaling relay")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() only reports validation problems; capture them here for
    // a real exit code.
    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Session duration: {}s", cfg.server.session_duration_secs);
                println!("  Extension: {}s", cfg.server.extension_secs);
                println!(
                    "  Interests: max {} of up to {} chars",
                    cfg.server.max_interests, cfg.server.max_interest_length
                );
                println!(
                    "  Max connections per IP: {}",
                    cfg.security.max_connections_per_ip
                );
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(
        %addr,
        session_duration_secs = cfg.server.session_duration_secs,
        "Starting VoiceLink server"
    );

    websocket::run_server(
        addr,
        ServerConfig::from_config(&cfg),
        &cfg.metrics,
        &cfg.security,
    )
    .await
}
