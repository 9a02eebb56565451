use super::VoiceServer;
use crate::coordination::RelayOutcome;
use crate::protocol::{ParticipantId, RoomId, SignalKind};

impl VoiceServer {
    /// Pass an offer, answer or candidate to the sender's partner.
    pub async fn handle_signal(
        &self,
        participant_id: &ParticipantId,
        kind: SignalKind,
        room_id: RoomId,
        payload: serde_json::Value,
    ) {
        let outcome = self
            .apply(|state, _now, out| state.relay(participant_id, &room_id, kind, payload, out))
            .await;

        match outcome {
            RelayOutcome::Delivered { .. } => self.metrics.increment_signals_relayed(),
            RelayOutcome::Dropped => self.metrics.increment_signals_dropped(),
        }
    }
}
