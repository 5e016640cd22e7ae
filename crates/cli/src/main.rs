//! gdkb - command-line interface for the GDK bridge daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use gdkbridge_core::application::Correlator;
use gdkbridge_core::domain::{operation, Discriminant, Envelope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9600";

#[derive(Parser)]
#[command(name = "gdkb")]
#[command(about = "GDK Bridge CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "GDKBRIDGE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a bridge function
    Call {
        /// Function name (e.g., xboxone_get_user_count)
        function: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Drain delivered envelopes
    Poll {
        /// Maximum number of envelopes
        #[arg(short, long)]
        max: Option<usize>,
    },

    /// Invoke an asynchronous function and wait for its result
    Wait {
        function: String,

        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Seconds to wait for the result
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Show daemon status
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct CallResult {
    function: String,
    result: Value,
    error: Option<String>,
}

#[derive(Tabled)]
struct EnvelopeRow {
    channel: String,
    request_id: String,
    kind: String,
    fields: String,
}

impl From<&Envelope> for EnvelopeRow {
    fn from(envelope: &Envelope) -> Self {
        let kind = match envelope.discriminant() {
            Discriminant::Type(t) | Discriminant::EventType(t) => t,
            Discriminant::Message { kind, event } => match event {
                Some(event) => format!("{} ({})", kind, event),
                None => kind.to_string(),
            },
            Discriminant::None => "-".to_string(),
        };
        Self {
            channel: envelope.channel.to_string(),
            request_id: envelope
                .request_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            kind,
            fields: Value::Object(envelope.fields.clone()).to_string(),
        }
    }
}

struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to daemon")?
            .json()
            .await
            .context("Failed to parse response")?;

        if let Some(error) = response.error {
            anyhow::bail!("RPC error ({}): {}", error.code, error.message);
        }
        response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result in response"))
    }

    async fn call(&self, function: &str, args: Value) -> Result<CallResult> {
        let result = self
            .request("gdk.call.v1", json!([{ "function": function, "args": args }]))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn poll(&self, max: Option<usize>) -> Result<Vec<Envelope>> {
        let result = self.request("events.poll.v1", json!([{ "max": max }])).await?;
        Ok(serde_json::from_value(result["envelopes"].clone())?)
    }
}

fn parse_args(args: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(args).context("Invalid JSON arguments")?;
    if !value.is_object() {
        anyhow::bail!("Arguments must be a JSON object");
    }
    Ok(value)
}

fn print_envelopes(envelopes: &[Envelope]) {
    if envelopes.is_empty() {
        println!("{}", "No envelopes".yellow());
        return;
    }
    let rows: Vec<EnvelopeRow> = envelopes.iter().map(EnvelopeRow::from).collect();
    println!("{}", Table::new(rows));
}

fn print_call(call: &CallResult) {
    match &call.error {
        None => println!("{} {} = {}", "✓".green().bold(), call.function, call.result),
        Some(error) => println!(
            "{} {} = {} ({})",
            "✗".red().bold(),
            call.function,
            call.result,
            error
        ),
    }
}

async fn wait(client: &RpcClient, function: &str, args: Value, timeout: Duration) -> Result<()> {
    let spec = operation::lookup(function)
        .ok_or_else(|| anyhow::anyhow!("{} does not complete asynchronously", function))?;

    let call = client.call(function, args).await?;
    print_call(&call);
    if call.error.is_some() {
        return Ok(());
    }

    let mut correlator = Correlator::default();
    let ticket = match spec.id_key {
        Some(_) => {
            let raw = call
                .result
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("No request id returned"))?;
            correlator.track_raw(function, raw)?
        }
        None => correlator.track_tag(function)?,
    };

    let deadline = Instant::now() + timeout;
    let mut unmatched = Vec::new();
    while Instant::now() < deadline {
        for envelope in client.poll(None).await? {
            match correlator.offer(&envelope) {
                Some(resolution) if resolution.ticket == ticket => {
                    let status = if resolution.outcome.is_success() {
                        "succeeded".green().bold()
                    } else {
                        format!("{:?}", resolution.outcome).red().bold()
                    };
                    println!("{} {}", "Result:".bold(), status);
                    print_envelopes(&[resolution.envelope]);
                    if !unmatched.is_empty() {
                        println!("{}", "Other envelopes received meanwhile:".cyan());
                        print_envelopes(&unmatched);
                    }
                    return Ok(());
                }
                _ => unmatched.push(envelope),
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("Timed out after {}s waiting for {}", timeout.as_secs(), function)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url.clone());

    match cli.command {
        Commands::Call { function, args } => {
            let call = client.call(&function, parse_args(&args)?).await?;
            print_call(&call);
        }

        Commands::Poll { max } => {
            let envelopes = client.poll(max).await?;
            print_envelopes(&envelopes);
        }

        Commands::Wait {
            function,
            args,
            timeout,
        } => {
            wait(
                &client,
                &function,
                parse_args(&args)?,
                Duration::from_secs(timeout),
            )
            .await?;
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.request("admin.stats.v1", json!([{}])).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Issued requests:".bold(), stats["issued_requests"]);
                    println!("  {} {}", "Queued envelopes:".bold(), stats["queued_envelopes"]);
                    println!(
                        "  {} {}",
                        "Delivered envelopes:".bold(),
                        stats["delivered_envelopes"]
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
