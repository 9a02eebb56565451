use crate::protocol::{ParticipantId, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

/// Write a message straight to the socket, bypassing the outbound queue.
///
/// Used before a participant is registered, when no queue exists yet.
pub(super) async fn send_immediate_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            "{\"type\":\"Error\",\"data\":{\"message\":\"Internal error\",\"error_code\":\"INTERNAL_ERROR\"}}"
                .to_string()
        }
    };

    sender.send(Message::Text(payload.into())).await
}

/// Serialize and write one queued message. `Err` means the socket is gone.
pub(super) async fn send_text_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    participant_id: &ParticipantId,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(%participant_id, "Failed to serialize message: {}", e);
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::warn!(%participant_id, "Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}
