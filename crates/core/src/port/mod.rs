// Port Layer - Interfaces for platform services

pub mod id_provider; // For deterministic testing
pub mod live_backend;
pub mod save_store;
pub mod store_backend;
pub mod time_provider;
pub mod user_directory;

// Re-exports
pub use id_provider::{IdProvider, SequentialIdProvider};
pub use live_backend::{LeaderboardPage, LeaderboardQuery, LiveBackend};
pub use save_store::{BlobWrite, SaveStore};
pub use store_backend::{Fulfillment, LicensePreview, StoreBackend, StoreUi};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use user_directory::{TokenAndSignature, TokenRequest, UserDirectory};
