//! Configuration loading and HTTP endpoint integration tests.
//!
//! Covers:
//! - Config loading from files, `VOICELINK_CONFIG_JSON` and `VOICELINK__*` overrides
//! - Health endpoint (`/health`)
//! - Metrics endpoints (`/metrics`, `/metrics/prom`)


use std::env;
use std::io::Write;
use test_helpers::{create_test_server, create_test_server_with_config, test_server_config, TestClient};
use voicelink_server::config::{self, Config, SecurityConfig};
use voicelink_server::server::ServerConfig;
use voicelink_server::websocket::create_router;

const CONFIG_ENV_VARS: &[&str] = &[
    "VOICELINK_CONFIG_PATH",
    "VOICELINK_CONFIG_JSON",
    "VOICELINK__PORT",
    "VOICELINK__SERVER__EXTENSION_SECS",
    "VOICELINK__SECURITY__CORS_ORIGINS",
    "VOICELINK__SECURITY__MAX_CONNECTIONS_PER_IP",
];

fn clear_config_env() {
    for key in CONFIG_ENV_VARS {
        env::remove_var(key);
    }
}

// ===========================================================================
// Config loading tests
// ===========================================================================

#[test]
#[serial_test::serial]
fn test_load_without_sources_uses_defaults() {
    clear_config_env();
    let loaded = config::load();
    let defaults = Config::default();
    assert_eq!(loaded.port, defaults.port);
    assert_eq!(
        loaded.server.session_duration_secs,
        defaults.server.session_duration_secs
    );
    assert_eq!(loaded.security.cors_origins, "*");
}

#[test]
#[serial_test::serial]
fn test_config_file_then_env_override() {
    clear_config_env();
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("voicelink.json");
    let mut file = std::fs::File::create(&config_file).unwrap();
    file.write_all(
        br#"{
            "port": 4100,
            "server": { "session_duration_secs": 120, "extension_secs": 90 },
            "security": { "max_connections_per_ip": 3 }
        }"#,
    )
    .unwrap();
    file.flush().unwrap();

    env::set_var("VOICELINK_CONFIG_PATH", config_file.to_str().unwrap());
    env::set_var("VOICELINK__SERVER__EXTENSION_SECS", "45");
    env::set_var(
        "VOICELINK__SECURITY__CORS_ORIGINS",
        "https://a.example,https://b.example",
    );

    let loaded = config::load();
    clear_config_env();

    assert_eq!(loaded.port, 4100); // From file
    assert_eq!(loaded.server.session_duration_secs, 120); // From file
    assert_eq!(loaded.server.extension_secs, 45); // Env wins over file
    assert_eq!(loaded.security.max_connections_per_ip, 3);
    assert_eq!(
        loaded.security.cors_origins,
        "https://a.example,https://b.example"
    );
    assert_eq!(loaded.server.max_interests, 5); // Default

    let runtime = ServerConfig::from_config(&loaded);
    assert_eq!(runtime.session_duration.as_secs(), 120);
    assert_eq!(runtime.extension.as_secs(), 45);
    assert_eq!(runtime.max_connections_per_ip, 3);
}

#[test]
#[serial_test::serial]
fn test_inline_json_beats_config_file() {
    clear_config_env();
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("voicelink.json");
    std::fs::write(&config_file, r#"{"port": 4100, "server": {"ping_timeout": 90}}"#).unwrap();

    env::set_var("VOICELINK_CONFIG_PATH", config_file.to_str().unwrap());
    env::set_var("VOICELINK_CONFIG_JSON", r#"{"port": 4200}"#);
    env::set_var("VOICELINK__PORT", "4300");

    let loaded = config::load();
    clear_config_env();

    assert_eq!(loaded.port, 4300);
    assert_eq!(loaded.server.ping_timeout, 90);
}

#[test]
#[serial_test::serial]
fn test_unparseable_file_is_skipped() {
    clear_config_env();
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("broken.json");
    std::fs::write(&config_file, "{ not json").unwrap();
    env::set_var("VOICELINK_CONFIG_PATH", config_file.to_str().unwrap());

    let loaded = config::load();
    clear_config_env();

    assert_eq!(loaded.port, Config::default().port);
}

#[test]
fn test_validation_rejects_auth_without_token() {
    let mut cfg = Config::default();
    cfg.security.require_metrics_auth = true;
    assert!(config::validate_config(&cfg).is_err());

    cfg.security.metrics_auth_token = Some("secret".to_string());
    assert!(config::validate_config(&cfg).is_ok());
}

#[test]
fn test_validation_rejects_zero_session() {
    let mut cfg = Config::default();
    cfg.server.session_duration_secs = 0;
    assert!(config::validate_config(&cfg).is_err());
}

// ===========================================================================
// Health endpoint tests
// ===========================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = create_test_server();
    let app = create_router(&SecurityConfig::default()).with_state(server);

    let test_server = axum_test::TestServer::new(app).expect("test server should start");
    let response = test_server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

// ===========================================================================
// Metrics endpoint tests
// ===========================================================================

#[tokio::test]
async fn test_metrics_endpoint_no_auth_required() {
    let server = create_test_server();
    let mut client = TestClient::connect(&server).await;
    server.handle_start_matching(&client.id, Vec::new()).await;
    client.drain();

    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/metrics").await;
    response.assert_status_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["online"], 1);
    assert_eq!(json["queueDepth"], 1);
    assert!(json.get("rolling").is_some(), "metrics should contain rolling");
    assert!(
        json.get("sessionDuration").is_some(),
        "metrics should contain sessionDuration"
    );
}

#[tokio::test]
async fn test_metrics_snapshot_is_opt_in() {
    let server = create_test_server();
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server
        .get("/v1/metrics")
        .add_query_param("includeSnapshot", "true")
        .await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert!(json["metricsSnapshot"]["connections"].is_object());
}

fn auth_config(token: &str) -> ServerConfig {
    let mut config = test_server_config();
    config.require_metrics_auth = true;
    config.metrics_auth_token = Some(token.to_string());
    config
}

#[tokio::test]
async fn test_metrics_endpoint_requires_auth_when_configured() {
    let server = create_test_server_with_config(auth_config("test-metrics-token"));
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/metrics").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let response = test_server.get("/metrics/prom").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_metrics_endpoint_accepts_valid_bearer_token() {
    let server = create_test_server_with_config(auth_config("valid-token"));
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server
        .get("/metrics")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer valid-token"
                .parse::<axum::http::HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_endpoint_rejects_invalid_bearer_token() {
    let server = create_test_server_with_config(auth_config("correct-token"));
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server
        .get("/metrics")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-token"
                .parse::<axum::http::HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_prometheus_metrics_endpoint_returns_text() {
    let server = create_test_server();
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/metrics/prom").await;
    response.assert_status_ok();

    let content_type = response.header(axum::http::header::CONTENT_TYPE);
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("text/plain; version=0.0.4"));

    let text = response.text();
    assert!(text.contains("# TYPE voicelink_connections_total counter"));
    assert!(text.contains("voicelink_queue_depth 0"));
}

// ===========================================================================
// Routing tests
// ===========================================================================

#[tokio::test]
async fn test_unknown_route_returns_banner() {
    let server = create_test_server();
    let app = create_router(&SecurityConfig::default()).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/nonexistent").await;
    response.assert_status_ok();
    assert!(response.text().contains("VoiceLink server"));
}

#[tokio::test]
async fn test_specific_cors_origins() {
    let server = create_test_server();
    let security = SecurityConfig {
        cors_origins: "https://app.example".to_string(),
        ..SecurityConfig::default()
    };
    let app = create_router(&security).with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server
        .get("/health")
        .add_header(
            axum::http::header::ORIGIN,
            "https://app.example"
                .parse::<axum::http::HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "https://app.example"
    );
}
