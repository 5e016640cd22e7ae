// Domain Layer - Requests, envelopes and the values they carry

pub mod constants;
pub mod descriptors;
pub mod envelope;
pub mod error;
pub mod file_error;
pub mod operation;
pub mod request;
pub mod user;

// Re-exports
pub use constants::{
    AchievementFilter, AchievementMessageType, LicenseStatus, PackageKind, PackageScope,
    Privilege, PrivilegeResult, ProductKind, ProgressState, ACHIEVEMENT_ALREADY_UNLOCKED,
};
pub use descriptors::{
    AchievementInfo, AddonLicenseDetails, GameLicense, Image, LeaderboardEntry, PackageDetails,
    Price, ProductDetails, StatValue,
};
pub use envelope::{AsyncChannel, Discriminant, Envelope};
pub use error::DomainError;
pub use file_error::FileError;
pub use operation::{OperationSpec, Outcome, StatusConvention, Tag};
pub use request::{RequestId, RequestState, SENTINEL_ERROR, SENTINEL_NO_CONTEXT};
pub use user::{UserId, UserProfile};
