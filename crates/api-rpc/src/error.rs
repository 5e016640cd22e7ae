//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use gdkbridge_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORAGE_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_)
        | AppError::Domain(_)
        | AppError::Serialization(_)
        | AppError::InvalidUser(_)
        | AppError::LiveContextUnavailable(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) | AppError::NotInitialized => {
            code::CONFLICT
        }
        AppError::Storage(_) => code::STORAGE_ERROR,
        AppError::Backend(_) | AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => {
            code::INTERNAL_ERROR
        }
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            to_rpc_error(AppError::Validation("x".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(to_rpc_error(AppError::NotFound("x".into())).code(), code::NOT_FOUND);
        assert_eq!(to_rpc_error(AppError::NotInitialized).code(), code::CONFLICT);
        assert_eq!(to_rpc_error(AppError::Storage("x".into())).code(), code::STORAGE_ERROR);
        assert_eq!(to_rpc_error(AppError::Internal("x".into())).code(), code::INTERNAL_ERROR);
        assert_eq!(throttled().code(), code::THROTTLED);
    }
}
