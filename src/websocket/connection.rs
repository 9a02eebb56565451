use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{RegisterClientError, VoiceServer};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::sending::{send_immediate_server_message, send_text_message};

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<VoiceServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let queue_capacity = server.config().websocket_config.outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    // Register client with server
    let participant_id = match server.register_client(tx, addr).await {
        Ok(participant_id) => {
            tracing::info!(%participant_id, client_addr = %addr, "WebSocket connection established");
            participant_id
        }
        Err(RegisterClientError::IpLimitExceeded { current, limit }) => {
            let error_message = ServerMessage::error(
                format!("Too many connections from your IP ({current}/{limit})"),
                ErrorCode::TooManyConnections,
            );
            if let Err(err) = send_immediate_server_message(&mut sender, &error_message).await {
                tracing::debug!(
                    client_addr = %addr,
                    error = %err,
                    "Failed to send IP limit error frame"
                );
            }
            let _ = sender.close().await;
            return;
        }
    };

    // Outgoing: drain the queue and keep the transport alive with pings
    let server_clone = server.clone();
    let mut send_task = tokio::spawn(async move {
        let ping_every = Duration::from_secs(server_clone.config().websocket_config.ping_interval_secs);
        let mut ping_interval =
            tokio::time::interval_at(tokio::time::Instant::now() + ping_every, ping_every);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    if send_text_message(&mut sender, &message, &participant_id).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        tracing::debug!(%participant_id, "Failed to send transport ping");
                        break;
                    }
                }
            }
        }

        let _ = sender.close().await;
    });

    // Incoming: size check, parse, route
    let server_clone = server.clone();
    let mut receive_task = tokio::spawn(async move {
        let max_size = server_clone.config().max_message_size;

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%participant_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    server_clone.record_activity(&participant_id);

                    if text.len() > max_size {
                        tracing::warn!(
                            %participant_id,
                            size = text.len(),
                            max = max_size,
                            "Message exceeds size limit"
                        );
                        server_clone.metrics().increment_oversized_messages();
                        server_clone.send_error_to_participant(
                            &participant_id,
                            format!(
                                "Message too large ({} bytes, max {} bytes)",
                                text.len(),
                                max_size
                            ),
                            ErrorCode::MessageTooLarge,
                        );
                        continue;
                    }

                    let client_message = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!(
                                %participant_id,
                                error = %err,
                                "Rejected client WebSocket frame"
                            );
                            server_clone.metrics().increment_malformed_messages();
                            server_clone.send_error_to_participant(
                                &participant_id,
                                format!("Malformed message: {err}"),
                                ErrorCode::MalformedMessage,
                            );
                            continue;
                        }
                    };

                    server_clone
                        .handle_client_message(&participant_id, client_message)
                        .await;
                }
                Message::Binary(_) => {
                    server_clone.metrics().increment_malformed_messages();
                    server_clone.send_error_to_participant(
                        &participant_id,
                        "Binary frames are not supported; send JSON text frames",
                        ErrorCode::MalformedMessage,
                    );
                }
                Message::Close(_) => {
                    tracing::info!(%participant_id, "WebSocket connection closed");
                    break;
                }
                Message::Pong(_) | Message::Ping(_) => {
                    server_clone.record_activity(&participant_id);
                }
            }
        }
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(%participant_id, "Send task completed");
            receive_task.abort();
        }
        _ = &mut receive_task => {
            tracing::debug!(%participant_id, "Receive task completed");
            send_task.abort();
        }
    }

    server.unregister_client(&participant_id).await;
}
