use super::VoiceServer;
use crate::coordination::{CoordinatorState, Outbox};
use crate::protocol::{ErrorCode, ParticipantId, ServerMessage};
use chrono::{DateTime, Utc};
use std::sync::Arc;

impl VoiceServer {
    /// Apply one coordination step and deliver what it produced.
    ///
    /// Delivery happens while the lock is held; each participant sees messages
    /// in step order.
    pub(crate) async fn apply<R>(
        &self,
        step: impl FnOnce(&mut CoordinatorState, DateTime<Utc>, &mut Outbox) -> R,
    ) -> R {
        let mut state = self.state.lock().await;
        let mut outbox = Outbox::new();
        let result = step(&mut state, Utc::now(), &mut outbox);
        self.dispatch(outbox);
        result
    }

    fn dispatch(&self, outbox: Outbox) {
        for (participant_id, message) in outbox {
            self.connection_manager
                .send_to(&participant_id, Arc::new(message));
        }
    }

    /// Send a message to one participant outside any coordination step.
    pub fn send_to_participant(&self, participant_id: &ParticipantId, message: ServerMessage) {
        self.connection_manager
            .send_to(participant_id, Arc::new(message));
    }

    /// Send a soft error; the connection stays open.
    pub fn send_error_to_participant(
        &self,
        participant_id: &ParticipantId,
        message: impl Into<String>,
        error_code: ErrorCode,
    ) {
        self.send_to_participant(participant_id, ServerMessage::error(message, error_code));
    }
}
