// Save/Load Error Codes (the `error` field of save_load envelopes)

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileError {
    #[error("no error")]
    NoError = 0,
    #[error("blob not found")]
    BlobNotFound = 1,
    #[error("container not in sync")]
    ContainerNotInSync = 2,
    #[error("container sync failed")]
    ContainerSyncFailed = 3,
    #[error("invalid container name")]
    InvalidContainerName = 4,
    #[error("no access")]
    NoAccess = 5,
    #[error("no service configuration")]
    NoServiceConfiguration = 6,
    #[error("user not registered in service")]
    UserNotRegisteredInService = 7,
    #[error("out of local storage")]
    OutOfLocalStorage = 8,
    #[error("provided buffer too small")]
    ProvidedBufferTooSmall = 9,
    #[error("quota exceeded")]
    QuotaExceeded = 10,
    #[error("update too big")]
    UpdateTooBig = 11,
    #[error("user canceled")]
    UserCanceled = 12,
    #[error("user not found")]
    UserNotFound = 13,
    #[error("unknown error")]
    UnknownError = 14,
}

impl FileError {
    /// Numeric code carried in the envelope
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(FileError::NoError.code(), 0);
        assert_eq!(FileError::BlobNotFound.code(), 1);
        assert_eq!(FileError::UserNotFound.code(), 13);
        assert_eq!(FileError::UnknownError.code(), 14);
    }
}
