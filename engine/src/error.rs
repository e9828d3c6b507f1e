//! Engine error types.

use thiserror::Error;
use uam_common::{GroupId, ObjectType};

/// Errors surfaced by the engine.
///
/// Only `Validation`, `GroupNotFound` and `Store` reach callers of the
/// mutating operations. The other variants are logged and degraded inside
/// the resolution path.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("No membership handler registered for object type {object_type}")]
    MissingMembershipHandler { object_type: ObjectType },

    #[error("User group not found: {0}")]
    GroupNotFound(GroupId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure reported by a content or group store.
#[derive(Debug, Clone, Error)]
#[error("Store error: {0}")]
pub struct StoreError(pub String);

/// Failure reported by a cache provider.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cached value for {key} could not be decoded: {reason}")]
    Decode { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let validation = EngineError::validation("name must not be empty");
        assert!(validation.to_string().contains("Validation error"));

        let missing = EngineError::MissingMembershipHandler {
            object_type: ObjectType::from("widget"),
        };
        assert!(missing.to_string().contains("widget"));

        let not_found = EngineError::GroupNotFound(GroupId::Stored(9));
        assert!(not_found.to_string().contains('9'));

        let store: EngineError = StoreError("connection refused".to_string()).into();
        assert!(store.to_string().contains("connection refused"));
    }
}
