// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid request state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
