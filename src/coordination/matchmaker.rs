//! Partner selection and the enter-matchmaking step.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::protocol::{ParticipantId, ServerMessage};

use super::{CoordinatorState, MatchOutcome, Outbox};

/// Number of interests two normalized lists share.
pub fn interest_score(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let lookup: HashSet<&str> = a.iter().map(String::as_str).collect();
    b.iter()
        .map(String::as_str)
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|interest| lookup.contains(interest))
        .count()
}

impl CoordinatorState {
    /// Pick the best eligible partner for `requester` from the waiting pool.
    ///
    /// With no declared interests the earliest eligible arrival wins. Otherwise
    /// the candidate with the strictly highest overlap wins, ties going to the
    /// earlier arrival. A candidate sharing nothing is still a valid match.
    pub fn find_match(&self, requester: &ParticipantId) -> Option<ParticipantId> {
        let participant = self.registry.get(requester)?;
        let candidates = self.pool.candidates_for(requester, &self.registry);

        if participant.interests().is_empty() {
            return candidates.first().copied();
        }

        let mut best: Option<(ParticipantId, usize)> = None;
        for candidate in candidates {
            let score = self
                .registry
                .get(&candidate)
                .map(|other| interest_score(participant.interests(), other.interests()))
                .unwrap_or(0);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// Enqueue a roomless participant and immediately try to pair them.
    ///
    /// The requester becomes the initiator of any room created here.
    pub fn enter_matchmaking(
        &mut self,
        id: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> MatchOutcome {
        if !self.registry.contains(id) || self.registry.room_of(id).is_some() {
            return MatchOutcome::Ignored;
        }

        self.pool.enqueue(*id);

        if let Some(candidate) = self.find_match(id) {
            if let Some(room_id) = self.create_room(id, &candidate, now, out) {
                return MatchOutcome::Matched {
                    room_id,
                    partner: candidate,
                };
            }
        }

        debug!(participant_id = %id, queue_depth = self.pool.len(), "No partner available, waiting");
        out.push(*id, ServerMessage::Waiting);
        MatchOutcome::Waiting
    }
}
