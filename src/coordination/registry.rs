//! Session registry: every currently connected participant and their mutable
//! matchmaking attributes.
//!
//! The registry is the leaf of the coordination state. Room and pool logic read
//! and write participants only through the accessors here, never by holding
//! references across operations.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::protocol::{normalize_interests, InterestError, ParticipantId, RoomId};

/// Limits applied when a participant declares interests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestLimits {
    pub max_interests: usize,
    pub max_interest_length: usize,
}

impl Default for InterestLimits {
    fn default() -> Self {
        Self {
            max_interests: crate::protocol::DEFAULT_MAX_INTERESTS,
            max_interest_length: crate::protocol::DEFAULT_MAX_INTEREST_LENGTH,
        }
    }
}

/// One live connection's matchmaking state.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub connected_at: DateTime<Utc>,
    interests: Vec<String>,
    room: Option<RoomId>,
    blocklist: HashSet<ParticipantId>,
}

impl Participant {
    fn new(id: ParticipantId, connected_at: DateTime<Utc>) -> Self {
        Self {
            id,
            connected_at,
            interests: Vec::new(),
            room: None,
            blocklist: HashSet::new(),
        }
    }

    /// Declared interests, normalized and in declaration order.
    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// Room this participant currently occupies, if any.
    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    pub fn has_blocked(&self, other: &ParticipantId) -> bool {
        self.blocklist.contains(other)
    }

    pub fn blocklist(&self) -> &HashSet<ParticipantId> {
        &self.blocklist
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    participants: HashMap<ParticipantId, Participant>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected participant under a new opaque handle.
    pub fn register(&mut self, now: DateTime<Utc>) -> ParticipantId {
        let id = Uuid::new_v4();
        self.participants.insert(id, Participant::new(id, now));
        id
    }

    /// Remove a participant. Returns `None` when the handle is already gone.
    ///
    /// Callers must resolve room and pool membership first; the registry only
    /// forgets the entry. Other participants' blocklists may keep the id.
    pub fn unregister(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(id)
    }

    /// Replace a participant's interests after normalization.
    ///
    /// On error nothing changes. Unknown handles are treated as stale and
    /// accepted without effect.
    pub fn set_interests(
        &mut self,
        id: &ParticipantId,
        raw: &[String],
        limits: InterestLimits,
    ) -> Result<(), InterestError> {
        let normalized = normalize_interests(raw, limits.max_interests, limits.max_interest_length)?;
        if let Some(participant) = self.participants.get_mut(id) {
            participant.interests = normalized;
        }
        Ok(())
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn room_of(&self, id: &ParticipantId) -> Option<RoomId> {
        self.participants.get(id).and_then(|p| p.room)
    }

    pub(crate) fn set_room(&mut self, id: &ParticipantId, room: Option<RoomId>) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.room = room;
        }
    }

    /// One-way block: `blocker` will never be paired with `blocked` again.
    pub(crate) fn block(&mut self, blocker: &ParticipantId, blocked: ParticipantId) {
        if let Some(participant) = self.participants.get_mut(blocker) {
            participant.blocklist.insert(blocked);
        }
    }

    /// True when either side has blocked the other.
    pub fn blocks_either(&self, a: &ParticipantId, b: &ParticipantId) -> bool {
        let a_blocks = self.participants.get(a).is_some_and(|p| p.has_blocked(b));
        let b_blocks = self.participants.get(b).is_some_and(|p| p.has_blocked(a));
        a_blocks || b_blocks
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn register_issues_distinct_handles() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.room_of(&a).is_none());
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        assert!(registry.unregister(&a).is_some());
        assert!(registry.unregister(&a).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn rejected_interests_leave_previous_ones_in_place() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        registry
            .set_interests(&a, &strings(&["Music"]), InterestLimits::default())
            .unwrap();

        let too_many = strings(&["a", "b", "c", "d", "e", "f"]);
        assert!(registry
            .set_interests(&a, &too_many, InterestLimits::default())
            .is_err());
        assert_eq!(registry.get(&a).unwrap().interests(), &["music".to_string()]);
    }

    #[test]
    fn blocking_is_one_way_but_checked_both_ways() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());
        registry.block(&a, b);

        assert!(registry.get(&a).unwrap().has_blocked(&b));
        assert!(!registry.get(&b).unwrap().has_blocked(&a));
        assert!(registry.blocks_either(&a, &b));
        assert!(registry.blocks_either(&b, &a));
    }

    #[test]
    fn blocklist_entries_survive_the_blocked_participant_leaving() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());
        registry.block(&a, b);
        registry.unregister(&b);

        assert!(registry.get(&a).unwrap().has_blocked(&b));
        assert!(registry.blocks_either(&a, &b));
    }
}
