//! Opaque relay of negotiation messages between room partners.

use tracing::debug;

use crate::protocol::{ParticipantId, RoomId, ServerMessage, SignalKind};

use super::{CoordinatorState, Outbox, RelayOutcome};

impl CoordinatorState {
    /// Forward a signal to the sender's partner in `room_id`.
    ///
    /// Dropped silently when the room is gone or the sender is not one of its
    /// occupants. The payload is never inspected.
    pub fn relay(
        &self,
        from: &ParticipantId,
        room_id: &RoomId,
        kind: SignalKind,
        payload: serde_json::Value,
        out: &mut Outbox,
    ) -> RelayOutcome {
        if self.registry.room_of(from).as_ref() != Some(room_id) {
            debug!(participant_id = %from, room_id = %room_id, kind = %kind, "Dropping signal for foreign room");
            return RelayOutcome::Dropped;
        }
        let Some(partner) = self
            .rooms
            .get(room_id)
            .and_then(|room| room.partner_of(from))
        else {
            debug!(participant_id = %from, room_id = %room_id, kind = %kind, "Dropping signal for closed room");
            return RelayOutcome::Dropped;
        };

        out.push(partner, ServerMessage::signal(kind, *room_id, payload));
        RelayOutcome::Delivered { to: partner }
    }
}
