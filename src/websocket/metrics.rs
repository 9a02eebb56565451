use crate::server::VoiceServer;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use std::sync::Arc;

use super::prometheus::render_prometheus_metrics;

fn enforce_metrics_auth(headers: &HeaderMap, server: &VoiceServer) -> Result<(), StatusCode> {
    let config = server.config();
    let Some(raw_header) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Unauthorized metrics access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("Unauthorized metrics access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = config.metrics_auth_token.as_deref() {
        if token == expected {
            tracing::debug!("Metrics access authorized via bearer token");
            return Ok(());
        }
    }

    tracing::warn!("Unauthorized metrics access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// Query parameters for the JSON metrics endpoint
#[derive(Debug, Default, serde::Deserialize)]
pub struct MetricsQuery {
    #[serde(default, rename = "includeSnapshot")]
    include_snapshot: bool,
}

/// Admin metrics: live occupancy, cumulative and rolling counters, session durations
pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<VoiceServer>>,
    axum::extract::Query(query): axum::extract::Query<MetricsQuery>,
) -> axum::response::Result<axum::response::Json<serde_json::Value>> {
    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let stats = server.stats().await;
    let snapshot = &stats.metrics;
    let health = server.metrics().health_status().await;

    let mut response = serde_json::json!({
        "timestamp": snapshot.timestamp.to_rfc3339(),
        "uptimeSeconds": stats.uptime_secs,
        "health": {
            "status": health.status,
            "issues": health.issues,
            "warnings": health.warnings
        },
        "online": stats.online,
        "queueDepth": stats.queue_depth,
        "activeRooms": stats.active_rooms,
        "totals": {
            "connections": snapshot.connections.total_connections,
            "matches": snapshot.matchmaking.matches_made,
            "skips": snapshot.matchmaking.skips,
            "stops": snapshot.matchmaking.stops,
            "reports": stats.total_reports,
            "extensionRequests": snapshot.rooms.extension_requests,
            "extensionsGranted": snapshot.rooms.extensions_granted,
            "expirations": snapshot.rooms.rooms_expired,
            "signalsRelayed": snapshot.signaling.signals_relayed,
            "signalsDropped": snapshot.signaling.signals_dropped
        },
        "rolling": snapshot.rolling,
        "sessionDuration": {
            "averageSeconds": snapshot.sessions.average_secs,
            "windowSize": snapshot.sessions.window_size,
            "p50Seconds": snapshot.sessions.p50_secs,
            "p95Seconds": snapshot.sessions.p95_secs,
            "p99Seconds": snapshot.sessions.p99_secs
        },
        "errors": {
            "validation": snapshot.errors.validation_errors,
            "malformed": snapshot.errors.malformed_messages,
            "oversized": snapshot.errors.oversized_messages,
            "total": snapshot.errors.total_errors
        }
    });

    if query.include_snapshot {
        if let Ok(snapshot_value) = serde_json::to_value(snapshot) {
            if let Some(obj) = response.as_object_mut() {
                obj.insert("metricsSnapshot".to_string(), snapshot_value);
            }
        }
    }

    Ok(axum::response::Json(response))
}

/// Prometheus metrics endpoint (text format, version 0.0.4)
pub async fn prometheus_metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<VoiceServer>>,
) -> axum::response::Result<axum::response::Response> {
    use axum::http::header::{HeaderValue, CONTENT_TYPE};
    use axum::response::IntoResponse;

    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let stats = server.stats().await;
    let body = render_prometheus_metrics(&stats);
    let headers = [(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    )];

    Ok((headers, body).into_response())
}
