//! GDK Bridge SDK - Rust Client Library
//!
//! Talks to the `gdkbridge` daemon over JSON-RPC and correlates the
//! envelopes it delivers with the requests that produced them.
//!
//! # Example
//!
//! ```no_run
//! use gdkbridge_sdk::GdkBridgeClient;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GdkBridgeClient::connect("http://127.0.0.1:9600").await?;
//!
//!     let ticket = client.issue("xboxone_show_account_picker", json!({})).await?;
//!     let picked = client.wait_for(ticket, Duration::from_secs(5)).await?;
//!     println!("picked user: {:?}", picked.envelope.get_i64("user"));
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientConfig, GdkBridgeClient};
pub use error::{Result, SdkError};
pub use gdkbridge_core::application::{Resolution, Ticket};
pub use gdkbridge_core::domain::{AsyncChannel, Envelope, Outcome};
pub use types::{CallResponse, StatsResponse};
