//! Two-party rooms: creation, mutual extension, departure and expiry.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{LeaveReason, ParticipantId, RoomId, ServerMessage};

use super::{ClosedRoom, CoordinatorState, ExpiredRoom, ExtensionOutcome, Outbox};

/// Lifecycle phase derived from the pending extension requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Active,
    PendingExtension,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub started_at: DateTime<Utc>,
    occupants: [ParticipantId; 2],
    deadline: DateTime<Utc>,
    extension_requests: HashSet<ParticipantId>,
}

impl Room {
    /// Participant who was told to start negotiation.
    pub fn initiator(&self) -> ParticipantId {
        self.occupants[0]
    }

    pub fn occupants(&self) -> [ParticipantId; 2] {
        self.occupants
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.occupants.contains(id)
    }

    /// The other occupant, or `None` if `id` is not in this room.
    pub fn partner_of(&self, id: &ParticipantId) -> Option<ParticipantId> {
        match self.occupants {
            [a, b] if a == *id => Some(b),
            [a, b] if b == *id => Some(a),
            _ => None,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn extension_requests(&self) -> &HashSet<ParticipantId> {
        &self.extension_requests
    }

    pub fn phase(&self) -> RoomPhase {
        if self.extension_requests.is_empty() {
            RoomPhase::Active
        } else {
            RoomPhase::PendingExtension
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// Active rooms keyed by id, plus the timing rules that govern them.
#[derive(Debug)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    session_duration: chrono::Duration,
    extension: chrono::Duration,
}

impl RoomTable {
    pub fn new(session_duration: chrono::Duration, extension: chrono::Duration) -> Self {
        Self {
            rooms: HashMap::new(),
            session_duration,
            extension,
        }
    }

    fn open(&mut self, initiator: ParticipantId, candidate: ParticipantId, now: DateTime<Utc>) -> &Room {
        let id = Uuid::new_v4();
        let room = Room {
            id,
            started_at: now,
            occupants: [initiator, candidate],
            deadline: add_clamped(now, self.session_duration),
            extension_requests: HashSet::new(),
        };
        self.rooms.entry(id).or_insert(room)
    }

    fn close(&mut self, id: &RoomId) -> Option<Room> {
        self.rooms.remove(id)
    }

    fn record_extension_request(
        &mut self,
        id: &RoomId,
        requester: ParticipantId,
        now: DateTime<Utc>,
    ) -> ExtensionOutcome {
        let extension = self.extension;
        let Some(room) = self.rooms.get_mut(id) else {
            return ExtensionOutcome::Ignored;
        };
        let Some(partner) = room.partner_of(&requester) else {
            return ExtensionOutcome::Ignored;
        };
        if room.is_expired(now) {
            return ExtensionOutcome::Ignored;
        }
        if !room.extension_requests.insert(requester) {
            return ExtensionOutcome::AlreadyRequested;
        }
        if room.extension_requests.len() < room.occupants.len() {
            return ExtensionOutcome::Pending { partner };
        }

        room.extension_requests.clear();
        room.deadline = add_clamped(room.deadline, extension);
        ExtensionOutcome::Extended {
            deadline: room.deadline,
            occupants: room.occupants,
        }
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Rooms whose deadline has passed, earliest deadline first.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<RoomId> {
        let mut expired: Vec<(DateTime<Utc>, RoomId)> = self
            .rooms
            .values()
            .filter(|room| room.is_expired(now))
            .map(|room| (room.deadline, room.id))
            .collect();
        expired.sort();
        expired.into_iter().map(|(_, id)| id).collect()
    }
}

fn add_clamped(at: DateTime<Utc>, by: chrono::Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl CoordinatorState {
    /// Pair two roomless participants in a fresh room.
    ///
    /// Both leave the waiting pool. Returns `None` without side effects when
    /// either side is unknown, already in a room, or the pair is the same id.
    pub fn create_room(
        &mut self,
        initiator: &ParticipantId,
        candidate: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> Option<RoomId> {
        if initiator == candidate {
            return None;
        }
        for id in [initiator, candidate] {
            if !self.registry.contains(id) || self.registry.room_of(id).is_some() {
                warn!(participant_id = %id, "Refusing to create room for unavailable participant");
                return None;
            }
        }

        self.pool.remove(initiator);
        self.pool.remove(candidate);

        let room = self.rooms.open(*initiator, *candidate, now);
        let room_id = room.id;
        let deadline = room.deadline;

        self.registry.set_room(initiator, Some(room_id));
        self.registry.set_room(candidate, Some(room_id));

        out.push(
            *initiator,
            ServerMessage::Matched {
                room_id,
                is_initiator: true,
                deadline,
            },
        );
        out.push(
            *candidate,
            ServerMessage::Matched {
                room_id,
                is_initiator: false,
                deadline,
            },
        );

        info!(
            room_id = %room_id,
            initiator = %initiator,
            candidate = %candidate,
            deadline = %deadline,
            "Room created"
        );
        Some(room_id)
    }

    /// Take `id` out of its room and tell the partner why.
    ///
    /// The room is discarded and the partner becomes roomless but is not
    /// re-queued. Returns `None` when `id` is not in a room.
    pub fn leave_room(
        &mut self,
        id: &ParticipantId,
        reason: LeaveReason,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> Option<ClosedRoom> {
        let room_id = self.registry.room_of(id)?;
        self.registry.set_room(id, None);

        let Some(room) = self.rooms.close(&room_id) else {
            warn!(participant_id = %id, room_id = %room_id, "Participant referenced a missing room");
            return None;
        };

        let partner = room.partner_of(id);
        if let Some(partner) = partner {
            self.registry.set_room(&partner, None);
            out.push(partner, ServerMessage::PartnerLeft { reason });
        }

        let duration = (now - room.started_at).to_std().unwrap_or_default();
        info!(
            room_id = %room_id,
            participant_id = %id,
            reason = %reason,
            duration_secs = duration.as_secs(),
            "Room closed"
        );

        Some(ClosedRoom {
            room_id,
            leaver: *id,
            partner,
            reason,
            duration,
        })
    }

    /// Record that `id` wants more time; extend once both occupants asked.
    pub fn request_extension(
        &mut self,
        id: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> ExtensionOutcome {
        let Some(room_id) = self.registry.room_of(id) else {
            return ExtensionOutcome::Ignored;
        };

        let outcome = self.rooms.record_extension_request(&room_id, *id, now);
        match &outcome {
            ExtensionOutcome::Pending { partner } => {
                out.push(*partner, ServerMessage::PartnerRequestedExtend);
            }
            ExtensionOutcome::Extended {
                deadline,
                occupants,
            } => {
                for occupant in occupants {
                    out.push(
                        *occupant,
                        ServerMessage::TimerExtended {
                            deadline: *deadline,
                        },
                    );
                }
                info!(room_id = %room_id, deadline = %deadline, "Room extended");
            }
            ExtensionOutcome::AlreadyRequested | ExtensionOutcome::Ignored => {
                debug!(participant_id = %id, room_id = %room_id, "Extension request ignored");
            }
        }
        outcome
    }

    /// Close every room past its deadline.
    ///
    /// The initiator is treated as having skipped: the partner hears
    /// `PartnerLeft { reason: skipped }`, the initiator hears `SessionExpired`
    /// and is put straight back into matchmaking.
    pub fn expire_rooms(&mut self, now: DateTime<Utc>, out: &mut Outbox) -> Vec<ExpiredRoom> {
        let mut expired = Vec::new();
        for room_id in self.rooms.expired(now) {
            let Some(initiator) = self.rooms.get(&room_id).map(Room::initiator) else {
                continue;
            };
            let Some(closed) = self.leave_room(&initiator, LeaveReason::Skipped, now, out) else {
                continue;
            };
            out.push(initiator, ServerMessage::SessionExpired { room_id });
            let rematch = self.enter_matchmaking(&initiator, now, out);
            expired.push(ExpiredRoom { closed, rematch });
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{CoordinatorSettings, MatchOutcome};
    use std::time::Duration;

    fn settings() -> CoordinatorSettings {
        CoordinatorSettings {
            session_duration: Duration::from_secs(300),
            extension: Duration::from_secs(300),
            ..CoordinatorSettings::default()
        }
    }

    fn paired(state: &mut CoordinatorState, now: DateTime<Utc>) -> (ParticipantId, ParticipantId, RoomId) {
        let a = state.register(now);
        let b = state.register(now);
        let mut out = Outbox::new();
        state.start_matching(&a, &[], now, &mut out).unwrap();
        state.start_matching(&b, &[], now, &mut out).unwrap();
        let room_id = state.registry().room_of(&a).expect("paired");
        (a, b, room_id)
    }

    #[test]
    fn later_requester_is_the_initiator() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, b, room_id) = paired(&mut state, now);

        let room = state.rooms().get(&room_id).unwrap();
        assert_eq!(room.initiator(), b);
        assert_eq!(room.partner_of(&b), Some(a));
        assert_eq!(room.deadline(), now + chrono::Duration::seconds(300));
        assert!(state.pool().is_empty());
    }

    #[test]
    fn create_room_refuses_occupied_participants() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, _, _) = paired(&mut state, now);
        let c = state.register(now);

        let mut out = Outbox::new();
        assert!(state.create_room(&c, &a, now, &mut out).is_none());
        assert!(state.create_room(&c, &c, now, &mut out).is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn extension_requires_both_sides() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, b, room_id) = paired(&mut state, now);

        let mut out = Outbox::new();
        assert_eq!(
            state.request_extension(&a, now, &mut out),
            ExtensionOutcome::Pending { partner: b }
        );
        assert_eq!(out.messages_for(&b), vec![&ServerMessage::PartnerRequestedExtend]);
        assert_eq!(state.rooms().get(&room_id).unwrap().phase(), RoomPhase::PendingExtension);

        let mut out = Outbox::new();
        assert_eq!(
            state.request_extension(&a, now, &mut out),
            ExtensionOutcome::AlreadyRequested
        );
        assert!(out.is_empty());

        let mut out = Outbox::new();
        let expected = now + chrono::Duration::seconds(600);
        assert!(matches!(
            state.request_extension(&b, now, &mut out),
            ExtensionOutcome::Extended { deadline, .. } if deadline == expected
        ));
        let room = state.rooms().get(&room_id).unwrap();
        assert_eq!(room.phase(), RoomPhase::Active);
        assert!(room.extension_requests().is_empty());
        for id in [a, b] {
            assert_eq!(
                out.messages_for(&id),
                vec![&ServerMessage::TimerExtended { deadline: expected }]
            );
        }
    }

    #[test]
    fn extension_after_deadline_is_ignored() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, _, _) = paired(&mut state, now);

        let mut out = Outbox::new();
        let late = now + chrono::Duration::seconds(300);
        assert_eq!(state.request_extension(&a, late, &mut out), ExtensionOutcome::Ignored);
        assert!(out.is_empty());
    }

    #[test]
    fn leaving_notifies_partner_without_requeueing_them() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, b, room_id) = paired(&mut state, now);

        let mut out = Outbox::new();
        let later = now + chrono::Duration::seconds(42);
        let closed = state
            .leave_room(&a, LeaveReason::Stopped, later, &mut out)
            .unwrap();

        assert_eq!(closed.room_id, room_id);
        assert_eq!(closed.partner, Some(b));
        assert_eq!(closed.duration, Duration::from_secs(42));
        assert_eq!(
            out.messages_for(&b),
            vec![&ServerMessage::PartnerLeft { reason: LeaveReason::Stopped }]
        );
        assert!(state.rooms().is_empty());
        assert!(state.registry().room_of(&b).is_none());
        assert!(!state.pool().contains(&b));
    }

    #[test]
    fn expiry_skips_on_behalf_of_the_initiator() {
        let mut state = CoordinatorState::new(settings());
        let now = Utc::now();
        let (a, b, room_id) = paired(&mut state, now);

        let mut out = Outbox::new();
        assert!(state.expire_rooms(now + chrono::Duration::seconds(299), &mut out).is_empty());

        let at = now + chrono::Duration::seconds(300);
        let expired = state.expire_rooms(at, &mut out);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].closed.room_id, room_id);
        assert_eq!(expired[0].closed.leaver, b);
        assert_eq!(expired[0].rematch, MatchOutcome::Waiting);

        assert_eq!(
            out.messages_for(&a),
            vec![&ServerMessage::PartnerLeft { reason: LeaveReason::Skipped }]
        );
        assert_eq!(
            out.messages_for(&b),
            vec![&ServerMessage::SessionExpired { room_id }, &ServerMessage::Waiting]
        );
        assert!(state.pool().contains(&b));
        assert!(!state.pool().contains(&a));
    }
}
