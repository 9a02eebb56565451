use crate::config::{MetricsConfig, SecurityConfig};
use crate::server::{ServerConfig, VoiceServer};
use axum::extract::State;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;

use super::handler::websocket_handler;
use super::metrics::{metrics_handler, prometheus_metrics_handler};

/// Create the Axum router with WebSocket support
pub fn create_router(security: &SecurityConfig) -> axum::Router<Arc<VoiceServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = match security.allowed_origins() {
        None => CorsLayer::permissive(),
        Some(configured) => {
            let origins: Vec<_> = configured
                .iter()
                .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!("No valid CORS origins configured, using permissive CORS");
                CorsLayer::permissive()
            } else {
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/v1/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/v1/metrics", get(metrics_handler))
        .route("/metrics/prom", get(prometheus_metrics_handler))
        .route("/v1/metrics/prom", get(prometheus_metrics_handler))
        .fallback(|| async {
            "VoiceLink server. Use /ws for the WebSocket protocol, /metrics for metrics, /metrics/prom for Prometheus."
        })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(
    State(server): State<Arc<VoiceServer>>,
) -> axum::response::Result<&'static str> {
    if server.health_check().await {
        Ok("OK")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

/// Build the server, start its sweeps and serve until the listener fails.
pub async fn run_server(
    addr: SocketAddr,
    server_config: ServerConfig,
    metrics_config: &MetricsConfig,
    security: &SecurityConfig,
) -> anyhow::Result<()> {
    let voice_server = VoiceServer::new(server_config, metrics_config);

    let cleanup_server = voice_server.clone();
    tokio::spawn(async move {
        cleanup_server.cleanup_task().await;
    });

    let app = create_router(security).with_state(voice_server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        instance_id = %voice_server.instance_id(),
        cors_origins = %security.cors_origins,
        "Server started over HTTP - WebSocket: /ws, Metrics: /metrics"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
