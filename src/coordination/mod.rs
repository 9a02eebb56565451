//! Matchmaking and room coordination.
//!
//! All session state lives in one [`CoordinatorState`] value. Every client event
//! and every expiry sweep is applied to it as a single synchronous step while
//! the server holds its lock, so no step ever observes another half-applied.
//! Steps never perform I/O: outbound messages are collected into an [`Outbox`]
//! and delivered by the caller afterwards.

pub mod matchmaker;
pub mod moderation;
pub mod registry;
pub mod room_coordinator;
pub mod signaling;
pub mod waiting_pool;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::protocol::{
    InterestError, LeaveReason, ParticipantId, RoomId, ServerMessage, DEFAULT_MAX_INTERESTS,
    DEFAULT_MAX_INTEREST_LENGTH,
};

pub use matchmaker::interest_score;
pub use moderation::ModerationLedger;
pub use registry::{InterestLimits, Participant, SessionRegistry};
pub use room_coordinator::{Room, RoomPhase, RoomTable};
pub use waiting_pool::WaitingPool;

pub(crate) fn chrono_duration_from_std(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Timing and validation knobs for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub session_duration: Duration,
    pub extension: Duration,
    pub max_interests: usize,
    pub max_interest_length: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            session_duration: Duration::from_secs(300),
            extension: Duration::from_secs(300),
            max_interests: DEFAULT_MAX_INTERESTS,
            max_interest_length: DEFAULT_MAX_INTEREST_LENGTH,
        }
    }
}

impl CoordinatorSettings {
    pub fn interest_limits(&self) -> InterestLimits {
        InterestLimits {
            max_interests: self.max_interests,
            max_interest_length: self.max_interest_length,
        }
    }
}

/// Messages produced by one coordination step, in emission order.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(ParticipantId, ServerMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: ParticipantId, message: ServerMessage) {
        self.messages.push((to, message));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ParticipantId, ServerMessage)> {
        self.messages.iter()
    }

    /// Messages addressed to one participant, in order.
    pub fn messages_for(&self, id: &ParticipantId) -> Vec<&ServerMessage> {
        self.messages
            .iter()
            .filter(|(to, _)| to == id)
            .map(|(_, message)| message)
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = (ParticipantId, ServerMessage);
    type IntoIter = std::vec::IntoIter<(ParticipantId, ServerMessage)>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A room was created with `partner`.
    Matched { room_id: RoomId, partner: ParticipantId },
    /// Queued without a partner.
    Waiting,
    /// Unknown participant, or one already in a room.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    /// No room, or the room is already past its deadline.
    Ignored,
    /// This occupant had already asked.
    AlreadyRequested,
    /// First request; the partner was notified.
    Pending { partner: ParticipantId },
    /// Both asked; the deadline moved.
    Extended {
        deadline: DateTime<Utc>,
        occupants: [ParticipantId; 2],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered { to: ParticipantId },
    Dropped,
}

/// A room torn down by a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRoom {
    pub room_id: RoomId,
    pub leaver: ParticipantId,
    pub partner: Option<ParticipantId>,
    pub reason: LeaveReason,
    /// Time from creation to teardown.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub reported: ParticipantId,
    pub report_count: u64,
    pub closed: ClosedRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutcome {
    pub closed: Option<ClosedRoom>,
    pub rematch: MatchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    pub closed: Option<ClosedRoom>,
    pub was_waiting: bool,
}

impl StopOutcome {
    /// Whether the stop closed a room or left the pool.
    pub fn had_effect(&self) -> bool {
        self.closed.is_some() || self.was_waiting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub closed: Option<ClosedRoom>,
    pub was_waiting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredRoom {
    pub closed: ClosedRoom,
    pub rematch: MatchOutcome,
}

/// The complete matchmaking state of one server process.
#[derive(Debug)]
pub struct CoordinatorState {
    settings: CoordinatorSettings,
    registry: SessionRegistry,
    pool: WaitingPool,
    rooms: RoomTable,
    ledger: ModerationLedger,
}

impl CoordinatorState {
    pub fn new(settings: CoordinatorSettings) -> Self {
        Self {
            rooms: RoomTable::new(
                chrono_duration_from_std(settings.session_duration),
                chrono_duration_from_std(settings.extension),
            ),
            settings,
            registry: SessionRegistry::new(),
            pool: WaitingPool::new(),
            ledger: ModerationLedger::new(),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WaitingPool {
        &self.pool
    }

    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    pub fn ledger(&self) -> &ModerationLedger {
        &self.ledger
    }

    pub fn register(&mut self, now: DateTime<Utc>) -> ParticipantId {
        self.registry.register(now)
    }

    /// Declare interests and enter matchmaking.
    ///
    /// Invalid interests are rejected before any state changes. A participant
    /// already in a room is left untouched.
    pub fn start_matching(
        &mut self,
        id: &ParticipantId,
        interests: &[String],
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> Result<MatchOutcome, InterestError> {
        if !self.registry.contains(id) {
            return Ok(MatchOutcome::Ignored);
        }
        if self.registry.room_of(id).is_some() {
            debug!(participant_id = %id, "Start matching ignored while in a room");
            return Ok(MatchOutcome::Ignored);
        }

        self.registry
            .set_interests(id, interests, self.settings.interest_limits())?;
        Ok(self.enter_matchmaking(id, now, out))
    }

    /// Leave the current room (if any) and the waiting pool.
    pub fn stop_matching(
        &mut self,
        id: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> StopOutcome {
        let closed = self.leave_room(id, LeaveReason::Stopped, now, out);
        let was_waiting = self.pool.remove(id);
        StopOutcome {
            closed,
            was_waiting,
        }
    }

    /// Leave the current partner (if any) and look for another one.
    pub fn skip(&mut self, id: &ParticipantId, now: DateTime<Utc>, out: &mut Outbox) -> SkipOutcome {
        let closed = self.leave_room(id, LeaveReason::Skipped, now, out);
        let rematch = self.enter_matchmaking(id, now, out);
        SkipOutcome { closed, rematch }
    }

    /// Forget a participant entirely. Returns `None` if already gone.
    pub fn disconnect(
        &mut self,
        id: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> Option<DisconnectOutcome> {
        if !self.registry.contains(id) {
            return None;
        }
        let closed = self.leave_room(id, LeaveReason::Disconnected, now, out);
        let was_waiting = self.pool.remove(id);
        self.registry.unregister(id);
        Some(DisconnectOutcome {
            closed,
            was_waiting,
        })
    }

    /// Check the cross-structure invariants, describing the first violation.
    pub fn verify_invariants(&self) -> Result<(), String> {
        for id in self.pool.iter() {
            if !self.registry.contains(id) {
                return Err(format!("pool member {id} is not registered"));
            }
            if self.registry.room_of(id).is_some() {
                return Err(format!("pool member {id} is also in a room"));
            }
        }

        for participant in self.registry.iter() {
            if let Some(room_id) = participant.room() {
                match self.rooms.get(&room_id) {
                    Some(room) if room.contains(&participant.id) => {}
                    Some(_) => {
                        return Err(format!(
                            "participant {} points at room {room_id} without occupying it",
                            participant.id
                        ))
                    }
                    None => {
                        return Err(format!(
                            "participant {} points at missing room {room_id}",
                            participant.id
                        ))
                    }
                }
            }
        }

        for room in self.rooms.iter() {
            let [a, b] = room.occupants();
            if a == b {
                return Err(format!("room {} pairs {a} with itself", room.id));
            }
            for occupant in [a, b] {
                if self.registry.room_of(&occupant) != Some(room.id) {
                    return Err(format!(
                        "room {} lists {occupant} who does not point back at it",
                        room.id
                    ));
                }
            }
            if room
                .extension_requests()
                .iter()
                .any(|requester| !room.contains(requester))
            {
                return Err(format!("room {} has an outsider extension request", room.id));
            }
        }

        Ok(())
    }
}
