//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use gdkbridge_core::domain::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    pub function: String,
    pub args: Value,
}

/// Response from gdk.call.v1
#[derive(Debug, Clone, Deserialize)]
pub struct CallResponse {
    pub function: String,
    pub result: Value,
    pub error: Option<String>,
}

impl CallResponse {
    /// Negative return code of a failed call
    pub fn code(&self) -> i64 {
        self.result.as_i64().unwrap_or(-1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollRequest {
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollResponse {
    pub envelopes: Vec<Envelope>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsRequest {}

/// Response from admin.stats.v1
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub issued_requests: u64,
    pub queued_envelopes: u64,
    pub delivered_envelopes: u64,
    pub uptime_seconds: u64,
}
