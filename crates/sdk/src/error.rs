//! SDK Error Types

use gdkbridge_core::application::Ticket;
use gdkbridge_core::error::AppError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    /// The function failed before issuing; `code` is its negative return value
    #[error("{function} failed ({code}): {message}")]
    CallFailed {
        function: String,
        code: i64,
        message: String,
    },

    #[error("Correlation error: {0}")]
    Correlation(#[from] AppError),

    #[error("Timed out waiting for request {0:?}")]
    Timeout(Ticket),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        match e {
            jsonrpsee::core::ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            jsonrpsee::core::ClientError::Transport(e) => SdkError::Transport(e.to_string()),
            jsonrpsee::core::ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection restart needed".to_string())
            }
            jsonrpsee::core::ClientError::ParseError(e) => SdkError::Serialization(e),
            _ => SdkError::Other(e.to_string()),
        }
    }
}

impl SdkError {
    /// The daemon is shedding load; retrying later may succeed
    pub fn is_throttled(&self) -> bool {
        matches!(self, SdkError::Rpc { code: 4003, .. })
    }
}
