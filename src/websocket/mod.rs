// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-socket send/receive loops
// - sending: message serialization and sending functions
// - routes: HTTP route setup (health, metrics, fallback)
// - metrics: metrics endpoints and bearer authentication
// - prometheus: Prometheus text rendering

mod connection;
mod handler;
mod metrics;
mod prometheus;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::{metrics_handler, prometheus_metrics_handler, MetricsQuery};
pub use routes::{create_router, run_server};
