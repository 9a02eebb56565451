use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default limits (can be overridden by config)
pub const DEFAULT_MAX_INTERESTS: usize = 5;
pub const DEFAULT_MAX_INTEREST_LENGTH: usize = 32;

/// Opaque handle for one live connection
pub type ParticipantId = Uuid;
/// Unique identifier for rooms
pub type RoomId = Uuid;

/// Why a participant left their room, as seen by the remaining partner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    /// Partner moved on to someone else (also used for timer expiry)
    Skipped,
    /// Partner's connection dropped
    Disconnected,
    /// Partner stopped matching altogether
    Stopped,
    /// Partner reported this participant
    Reported,
}

impl LeaveReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Disconnected => "disconnected",
            Self::Stopped => "stopped",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three negotiation message kinds the relay passes through blind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
