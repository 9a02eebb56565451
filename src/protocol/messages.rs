use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{LeaveReason, RoomId, SignalKind};

/// Message types sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Declare interests, join the waiting pool and try to find a partner
    StartMatching {
        #[serde(default)]
        interests: Vec<String>,
    },
    /// Leave the current room (if any) and the waiting pool
    StopMatching,
    /// Leave the current partner and look for a new one
    Skip,
    /// Ask for more time; granted once both partners ask
    RequestExtend,
    /// Report the current partner and block them for the rest of the connection
    Report,
    /// Session description offer for the partner
    Offer {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// Session description answer for the partner
    Answer {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// Connectivity candidate fragment for the partner
    Candidate {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// Heartbeat to maintain connection
    Ping,
}

impl ClientMessage {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartMatching { .. } => "start_matching",
            Self::StopMatching => "stop_matching",
            Self::Skip => "skip",
            Self::RequestExtend => "request_extend",
            Self::Report => "report",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Ping => "ping",
        }
    }
}

/// Message types sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Queued; no partner available yet
    Waiting,
    /// Paired with a partner in a fresh room
    Matched {
        room_id: RoomId,
        /// The initiator starts media negotiation by sending an offer
        is_initiator: bool,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        deadline: DateTime<Utc>,
    },
    /// Offer relayed from the partner
    Offer {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// Answer relayed from the partner
    Answer {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// Candidate relayed from the partner
    Candidate {
        room_id: RoomId,
        payload: serde_json::Value,
    },
    /// The partner left the room
    PartnerLeft { reason: LeaveReason },
    /// The partner wants to extend; waiting on this side
    PartnerRequestedExtend,
    /// Both partners agreed; the room runs until the new deadline
    TimerExtended {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        deadline: DateTime<Utc>,
    },
    /// The report was recorded and the partner is blocked
    ReportConfirmed,
    /// The room timer ran out; matchmaking restarts automatically
    SessionExpired { room_id: RoomId },
    /// Pong response to ping
    Pong,
    /// Soft error; the connection stays open
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    /// Build the outbound relay message for a signal of the given kind.
    pub fn signal(kind: SignalKind, room_id: RoomId, payload: serde_json::Value) -> Self {
        match kind {
            SignalKind::Offer => Self::Offer { room_id, payload },
            SignalKind::Answer => Self::Answer { room_id, payload },
            SignalKind::Candidate => Self::Candidate { room_id, payload },
        }
    }

    pub fn error(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Self::Error {
            message: message.into(),
            error_code: Some(error_code),
        }
    }
}
