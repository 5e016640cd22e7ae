// Central Error Type for the Application

use crate::domain::{SENTINEL_ERROR, SENTINEL_NO_CONTEXT};
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Runtime not initialized")]
    NotInitialized,

    #[error("Invalid user: {0}")]
    InvalidUser(String),

    #[error("Xbox Live context unavailable for user {0}")]
    LiveContextUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Negative value an issuing call returns for this failure
    pub fn sentinel(&self) -> i64 {
        match self {
            AppError::LiveContextUnavailable(_) => SENTINEL_NO_CONTEXT,
            _ => SENTINEL_ERROR,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(AppError::InvalidUser("0".into()).sentinel(), -1);
        assert_eq!(AppError::LiveContextUnavailable("7".into()).sentinel(), -2);
        assert_eq!(AppError::NotInitialized.sentinel(), -1);
        assert_eq!(AppError::Validation("x".into()).sentinel(), -1);
    }
}
