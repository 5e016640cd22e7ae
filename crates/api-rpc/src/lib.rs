//! JSON-RPC API Layer
//!
//! Exposes the GDK bridge runtime over JSON-RPC 2.0: issuing calls,
//! envelope polling and runtime statistics.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use rate_limiter::RateLimiter;
pub use server::{RpcServer, RpcServerConfig};
