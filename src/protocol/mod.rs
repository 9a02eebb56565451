// Protocol module: wire messages, identifiers and input validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{
    LeaveReason, ParticipantId, RoomId, SignalKind, DEFAULT_MAX_INTERESTS,
    DEFAULT_MAX_INTEREST_LENGTH,
};

pub use messages::{ClientMessage, ServerMessage};

pub use validation::{normalize_interests, InterestError};
