//! Error types for parsing shared identifiers.

use thiserror::Error;

/// Errors raised while parsing identifiers and value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid group id: {0}")]
    InvalidGroupId(String),

    #[error("Invalid access level: {0}")]
    InvalidAccessLevel(String),

    #[error("Invalid IP range: {0}")]
    InvalidIpRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
