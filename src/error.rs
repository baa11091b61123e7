//! Error types for the id mapper

use thiserror::Error;

use crate::extract::KeyKind;
use crate::idmap::MapperState;

pub type Result<T> = std::result::Result<T, IdMapError>;

#[derive(Error, Debug)]
pub enum IdMapError {
    #[error("Malformed {kind} value '{token}' at ordinal {ordinal}")]
    MalformedValue {
        kind: KeyKind,
        token: String,
        ordinal: u64,
    },

    #[error("Expected {expected} key, got {found} key")]
    KeyKindMismatch { expected: KeyKind, found: KeyKind },

    #[error("Duplicate id '{key}' declared at ordinals {first} and {second}")]
    DuplicateId { key: String, first: u64, second: u64 },

    #[error("Id not found: {key}")]
    NotFound { key: String },

    #[error("Cannot {operation} while mapper is {state}")]
    InvalidState {
        operation: &'static str,
        state: MapperState,
    },

    #[error("Ordinal {0} was already assigned a key")]
    OrdinalReused(u64),

    #[error("Ordinal {ordinal} pushed after {previous}")]
    OrdinalOutOfOrder { ordinal: u64, previous: u64 },

    #[error("Ordinal {ordinal} outside batch range {start}..{end}")]
    OrdinalOutOfRange { ordinal: u64, start: u64, end: u64 },

    #[error("Ordinal {0} is past the addressable range")]
    OrdinalOverflow(u64),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdMapError {
    /// Stable error code for reports and rejected-record logs.
    pub fn code(&self) -> &'static str {
        match self {
            IdMapError::MalformedValue { .. } => "MALFORMED_VALUE",
            IdMapError::KeyKindMismatch { .. } => "KEY_KIND_MISMATCH",
            IdMapError::DuplicateId { .. } => "DUPLICATE_ID",
            IdMapError::NotFound { .. } => "NOT_FOUND",
            IdMapError::InvalidState { .. } => "INVALID_STATE",
            IdMapError::OrdinalReused(_)
            | IdMapError::OrdinalOutOfOrder { .. }
            | IdMapError::OrdinalOutOfRange { .. }
            | IdMapError::OrdinalOverflow(_) => "BAD_ORDINAL",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Whether the import pipeline may skip the offending record and go on.
    ///
    /// Duplicate ids and state violations abort the current build.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IdMapError::MalformedValue { .. }
                | IdMapError::NotFound { .. }
                | IdMapError::KeyKindMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = IdMapError::DuplicateId {
            key: "alice".into(),
            first: 0,
            second: 2,
        };
        assert_eq!(err.code(), "DUPLICATE_ID");
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Duplicate id 'alice' declared at ordinals 0 and 2"
        );

        let err = IdMapError::NotFound { key: "bob".into() };
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = IdMapError::InvalidState {
            operation: "lookup",
            state: MapperState::Collecting,
        };
        assert_eq!(err.to_string(), "Cannot lookup while mapper is collecting");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_message() {
        let err = IdMapError::MalformedValue {
            kind: KeyKind::Integer,
            token: "12a".into(),
            ordinal: 7,
        };
        assert_eq!(err.to_string(), "Malformed integer value '12a' at ordinal 7");
        assert_eq!(err.code(), "MALFORMED_VALUE");
    }
}
