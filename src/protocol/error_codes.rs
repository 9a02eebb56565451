use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured soft errors sent to clients.
///
/// None of these are fatal: the connection stays usable unless the code is
/// [`ErrorCode::TooManyConnections`], which is sent right before the socket closes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (2xxx)
    InvalidInput,
    TooManyInterests,
    MessageTooLarge,
    MalformedMessage,

    // Connection errors (5xxx)
    TooManyConnections,

    // Server errors (9xxx)
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The request contained invalid input.",
            Self::TooManyInterests => {
                "Too many interests declared. Remove some interests and try again."
            }
            Self::MessageTooLarge => "The message exceeds the maximum allowed size.",
            Self::MalformedMessage => "The message could not be parsed.",
            Self::TooManyConnections => "Too many connections from this address.",
            Self::InternalError => "An internal server error occurred.",
        }
    }

    /// Numeric code grouped by category, for clients that prefer integers.
    pub fn numeric(&self) -> u16 {
        match self {
            Self::InvalidInput => 2001,
            Self::TooManyInterests => 2002,
            Self::MessageTooLarge => 2003,
            Self::MalformedMessage => 2004,
            Self::TooManyConnections => 5001,
            Self::InternalError => 9001,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.numeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::TooManyInterests).unwrap();
        assert_eq!(json, "\"TOO_MANY_INTERESTS\"");

        let parsed: ErrorCode = serde_json::from_str("\"MESSAGE_TOO_LARGE\"").unwrap();
        assert_eq!(parsed, ErrorCode::MessageTooLarge);
    }

    #[test]
    fn numeric_codes_follow_category_ranges() {
        assert!((2000..3000).contains(&ErrorCode::InvalidInput.numeric()));
        assert!((5000..6000).contains(&ErrorCode::TooManyConnections.numeric()));
        assert!((9000..10000).contains(&ErrorCode::InternalError.numeric()));
    }
}
