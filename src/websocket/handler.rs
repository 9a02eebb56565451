use crate::server::VoiceServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the matchmaking protocol
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<VoiceServer>>,
) -> Response {
    // Oversized frames are answered with a soft error rather than a dropped
    // connection, so the transport limit sits well above the protocol one.
    let transport_limit = server.config().max_message_size.saturating_mul(4).max(1024);
    ws.max_message_size(transport_limit)
        .on_upgrade(move |socket| handle_socket(socket, server, addr))
}
