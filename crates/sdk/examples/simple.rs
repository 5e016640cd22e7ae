//! Simple SDK Example
//!
//! Picks an account, then queries its game license.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package gdkbridge-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --package gdkbridge-sdk --example simple
//!    ```

use gdkbridge_sdk::GdkBridgeClient;
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("GDK Bridge SDK - Simple Example");
    println!("===============================\n");

    let client = GdkBridgeClient::connect("http://127.0.0.1:9600").await?;
    println!("1. Connected\n");

    let ticket = client
        .issue("xboxone_show_account_picker", json!({ "allow_guests": false }))
        .await?;
    let picked = client.wait_for(ticket, Duration::from_secs(5)).await?;
    let user = picked.envelope.get_i64("user").unwrap_or(0);
    println!("2. Account picker returned user {}\n", user);

    let ticket = client
        .issue("ms_iap_QueryGameLicense", json!({ "user": user }))
        .await?;
    let license = client.wait_for(ticket, Duration::from_secs(5)).await?;
    println!("3. Game license ({:?}):", license.outcome);
    println!("{}", serde_json::to_string_pretty(&license.envelope.fields)?);

    let stats = client.stats().await?;
    println!(
        "\n4. Daemon issued {} requests, delivered {} envelopes",
        stats.issued_requests, stats.delivered_envelopes
    );
    Ok(())
}
