//! RPC Method Handlers
//!
//! Bridges each JSON-RPC method onto the runtime.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    CallRequest, CallResponse, PollRequest, PollResponse, StatsRequest, StatsResponse,
};
use gdkbridge_core::application::constants::MAX_POLL_BATCH;
use gdkbridge_core::application::Runtime;
use gdkbridge_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Token bucket settings for the issuing methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub burst: u32,
    pub rate_per_sec: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 200,
            rate_per_sec: 100,
        }
    }
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    runtime: Arc<Runtime>,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(runtime: Arc<Runtime>, limits: RateLimitConfig) -> Self {
        Self {
            runtime,
            rate_limiter: RateLimiter::new(limits.burst, limits.rate_per_sec),
            start_time: Instant::now(),
        }
    }

    /// gdk.call.v1
    ///
    /// Synchronous failures are part of the response, not an RPC error:
    /// the caller gets the same negative code a direct call would return.
    pub async fn call(&self, params: CallRequest) -> Result<CallResponse, ErrorObjectOwned> {
        if !self.rate_limiter.try_acquire() {
            return Err(throttled());
        }
        if params.function.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "function name is empty".to_string(),
            )));
        }

        let outcome = self.runtime.call(&params.function, params.args);
        Ok(CallResponse {
            function: params.function,
            result: outcome.value,
            error: outcome.error,
        })
    }

    /// events.poll.v1
    pub async fn poll(&self, params: PollRequest) -> Result<PollResponse, ErrorObjectOwned> {
        let max = params.max.unwrap_or(MAX_POLL_BATCH).clamp(1, MAX_POLL_BATCH);
        let envelopes = self.runtime.poll(max).map_err(to_rpc_error)?;
        if !envelopes.is_empty() {
            debug!(count = envelopes.len(), "Envelopes delivered");
        }
        Ok(PollResponse { envelopes })
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let stats = self.runtime.stats().map_err(to_rpc_error)?;
        Ok(StatsResponse {
            issued_requests: stats.issued_requests,
            queued_envelopes: stats.queued_envelopes,
            delivered_envelopes: stats.delivered_envelopes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}
