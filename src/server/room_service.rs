use super::VoiceServer;
use crate::coordination::{ClosedRoom, ExtensionOutcome};
use crate::protocol::ParticipantId;

impl VoiceServer {
    /// Ask for more time in the current room.
    pub async fn handle_request_extend(&self, participant_id: &ParticipantId) {
        let outcome = self
            .apply(|state, now, out| state.request_extension(participant_id, now, out))
            .await;

        match outcome {
            ExtensionOutcome::Pending { .. } => self.metrics.increment_extension_requests(),
            ExtensionOutcome::Extended { .. } => {
                self.metrics.increment_extension_requests();
                self.metrics.increment_extensions_granted().await;
            }
            ExtensionOutcome::AlreadyRequested | ExtensionOutcome::Ignored => {}
        }
    }

    /// Report and block the current partner.
    pub async fn handle_report(&self, participant_id: &ParticipantId) {
        let outcome = self
            .apply(|state, now, out| state.report(participant_id, now, out))
            .await;

        if let Some(outcome) = outcome {
            self.metrics.increment_reports().await;
            self.record_closed_room(&outcome.closed).await;
        }
    }

    /// Close every room whose deadline has passed; returns how many closed.
    pub async fn run_expiry_sweep(&self) -> usize {
        let expired = self
            .apply(|state, now, out| state.expire_rooms(now, out))
            .await;

        for room in &expired {
            tracing::info!(
                room_id = %room.closed.room_id,
                initiator = %room.closed.leaver,
                "Session expired"
            );
            self.metrics.increment_rooms_expired().await;
            self.record_closed_room(&room.closed).await;
            self.record_match_outcome(room.rematch).await;
        }
        expired.len()
    }

    pub(super) async fn record_closed_room(&self, closed: &ClosedRoom) {
        self.metrics.record_room_closed(closed.duration).await;
    }
}
