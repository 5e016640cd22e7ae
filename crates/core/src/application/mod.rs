// Application Layer - Services and the Async Correlation Layer

pub mod base;
pub mod constants;
pub mod correlation;
pub mod flush;
pub mod iap;
pub mod issuer;
pub mod runtime;
pub mod shutdown;
pub mod storage;
pub mod xbox_live;

// Re-exports
pub use base::UserService;
pub use correlation::{event_queue, Correlator, EventSender, Inbox, Resolution, Ticket};
pub use flush::StatsFlushScheduler;
pub use iap::IapService;
pub use issuer::AsyncIssuer;
pub use runtime::{CallOutcome, Runtime, RuntimeDeps, RuntimeStats};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use storage::{BufferPool, StorageService};
pub use xbox_live::LiveService;
