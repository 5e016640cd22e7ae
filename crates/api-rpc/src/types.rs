//! RPC Request/Response Types
//!
//! Parameters and results of the JSON-RPC methods.

use gdkbridge_core::domain::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// gdk.call.v1 - Invoke a bridge function by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub function: String,
    #[serde(default)]
    pub args: Value,
}

/// `result` is the request id, the function's value, or a negative
/// sentinel; `error` explains a synchronous failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    pub function: String,
    pub result: Value,
    pub error: Option<String>,
}

/// events.poll.v1 - Drain envelopes from the inbox
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollRequest {
    #[serde(default)]
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub envelopes: Vec<Envelope>,
}

/// admin.stats.v1 - Runtime statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub issued_requests: u64,
    pub queued_envelopes: u64,
    pub delivered_envelopes: u64,
    pub uptime_seconds: u64,
}
