use thiserror::Error;

use super::error_codes::ErrorCode;

/// Rejection reasons for a declared interest list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterestError {
    #[error("Too many interests ({count}, max {limit})")]
    TooMany { count: usize, limit: usize },
    #[error("Interest `{interest}` is too long (max {max_length} characters)")]
    TooLong { interest: String, max_length: usize },
}

impl InterestError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TooMany { .. } => ErrorCode::TooManyInterests,
            Self::TooLong { .. } => ErrorCode::InvalidInput,
        }
    }
}

/// Normalize a declared interest list.
///
/// Entries are trimmed and lowercased; blanks are dropped; duplicates keep their
/// first position. More than `max_interests` distinct entries is rejected as a
/// whole rather than truncated.
pub fn normalize_interests(
    raw: &[String],
    max_interests: usize,
    max_interest_length: usize,
) -> Result<Vec<String>, InterestError> {
    let mut normalized: Vec<String> = Vec::with_capacity(raw.len().min(max_interests));

    for entry in raw {
        let interest = entry.trim().to_lowercase();
        if interest.is_empty() {
            continue;
        }
        if interest.chars().count() > max_interest_length {
            return Err(InterestError::TooLong {
                interest,
                max_length: max_interest_length,
            });
        }
        if !normalized.contains(&interest) {
            normalized.push(interest);
        }
    }

    if normalized.len() > max_interests {
        return Err(InterestError::TooMany {
            count: normalized.len(),
            limit: max_interests,
        });
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn trims_lowercases_and_dedups() {
        let result =
            normalize_interests(&strings(&[" Music", "music ", "SPORTS", ""]), 5, 32).unwrap();
        assert_eq!(result, strings(&["music", "sports"]));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let result = normalize_interests(&strings(&["   ", "", "\t"]), 5, 32).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn duplicates_do_not_count_towards_the_cap() {
        let raw = strings(&["a", "b", "c", "d", "e", "A", " b "]);
        let result = normalize_interests(&raw, 5, 32).unwrap();
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn sixth_distinct_interest_is_a_capacity_error() {
        let raw = strings(&["a", "b", "c", "d", "e", "f"]);
        let err = normalize_interests(&raw, 5, 32).unwrap_err();
        assert_eq!(err, InterestError::TooMany { count: 6, limit: 5 });
        assert_eq!(err.error_code(), ErrorCode::TooManyInterests);
    }

    #[test]
    fn overlong_interest_is_rejected() {
        let raw = strings(&["x".repeat(40).as_str()]);
        let err = normalize_interests(&raw, 5, 32).unwrap_err();
        assert!(matches!(err, InterestError::TooLong { max_length: 32, .. }));
        assert_eq!(err.error_code(), ErrorCode::InvalidInput);
    }
}
