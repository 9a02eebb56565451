use crate::protocol::{ClientMessage, ParticipantId, SignalKind};

use super::VoiceServer;

impl VoiceServer {
    /// Dispatch one parsed client message.
    pub async fn handle_client_message(&self, participant_id: &ParticipantId, message: ClientMessage) {
        tracing::trace!(%participant_id, kind = message.kind(), "Client message");

        match message {
            ClientMessage::StartMatching { interests } => {
                self.handle_start_matching(participant_id, interests).await;
            }
            ClientMessage::StopMatching => {
                self.handle_stop_matching(participant_id).await;
            }
            ClientMessage::Skip => {
                self.handle_skip(participant_id).await;
            }
            ClientMessage::RequestExtend => {
                self.handle_request_extend(participant_id).await;
            }
            ClientMessage::Report => {
                self.handle_report(participant_id).await;
            }
            ClientMessage::Offer { room_id, payload } => {
                self.handle_signal(participant_id, SignalKind::Offer, room_id, payload)
                    .await;
            }
            ClientMessage::Answer { room_id, payload } => {
                self.handle_signal(participant_id, SignalKind::Answer, room_id, payload)
                    .await;
            }
            ClientMessage::Candidate { room_id, payload } => {
                self.handle_signal(participant_id, SignalKind::Candidate, room_id, payload)
                    .await;
            }
            ClientMessage::Ping => {
                self.handle_ping(participant_id);
            }
        }
    }
}
