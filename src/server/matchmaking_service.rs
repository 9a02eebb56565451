use super::VoiceServer;
use crate::coordination::MatchOutcome;
use crate::protocol::ParticipantId;

impl VoiceServer {
    /// Declare interests and look for a partner.
    pub async fn handle_start_matching(&self, participant_id: &ParticipantId, interests: Vec<String>) {
        self.metrics.increment_matchmaking_requests();

        let result = self
            .apply(|state, now, out| state.start_matching(participant_id, &interests, now, out))
            .await;

        match result {
            Ok(outcome) => self.record_match_outcome(outcome).await,
            Err(err) => {
                self.metrics.increment_validation_errors();
                tracing::warn!(
                    %participant_id,
                    error = %err,
                    "Rejected interest list"
                );
                self.send_error_to_participant(participant_id, err.to_string(), err.error_code());
            }
        }
    }

    /// Leave the room and the waiting pool.
    ///
    /// Only stops that closed a room or left the pool are counted.
    pub async fn handle_stop_matching(&self, participant_id: &ParticipantId) {
        let outcome = self
            .apply(|state, now, out| state.stop_matching(participant_id, now, out))
            .await;

        if !outcome.had_effect() {
            tracing::debug!(%participant_id, "Stop matching ignored; not waiting or paired");
            return;
        }

        self.metrics.increment_stops();
        if let Some(closed) = outcome.closed {
            self.record_closed_room(&closed).await;
        }
        tracing::debug!(%participant_id, "Stopped matching");
    }

    /// Drop the current partner and look for another.
    pub async fn handle_skip(&self, participant_id: &ParticipantId) {
        let outcome = self
            .apply(|state, now, out| state.skip(participant_id, now, out))
            .await;

        if let Some(closed) = outcome.closed {
            self.metrics.increment_skips().await;
            self.record_closed_room(&closed).await;
        }
        self.record_match_outcome(outcome.rematch).await;
    }

    pub(super) async fn record_match_outcome(&self, outcome: MatchOutcome) {
        if let MatchOutcome::Matched { .. } = outcome {
            self.metrics.increment_matches().await;
        }
    }
}
