//! GDK Bridge Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{CallRequest, CallResponse, PollRequest, PollResponse, StatsRequest, StatsResponse};
use gdkbridge_core::application::correlation::DEFAULT_RESOLVED_HISTORY;
use gdkbridge_core::application::{Correlator, Resolution, Ticket};
use gdkbridge_core::domain::{operation, Envelope};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    /// Delay between polls while waiting
    pub poll_interval: Duration,
    /// Resolved ids remembered to drop duplicate deliveries
    pub resolved_history: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(16),
            resolved_history: DEFAULT_RESOLVED_HISTORY,
        }
    }
}

/// Correlation state shared by every caller of one client
///
/// Unclaimed resolutions and unmatched envelopes are each kept up to
/// `limit` entries; the oldest are dropped first.
pub(crate) struct Tracker {
    correlator: Correlator,
    resolved: BTreeMap<Ticket, Resolution>,
    unmatched: VecDeque<Envelope>,
    limit: usize,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::with_history(DEFAULT_RESOLVED_HISTORY)
    }
}

impl Tracker {
    fn with_history(history: usize) -> Self {
        Self {
            correlator: Correlator::new(history),
            resolved: BTreeMap::new(),
            unmatched: VecDeque::new(),
            limit: history.max(1),
        }
    }

    /// Track the value a successful issuing call returned
    ///
    /// The envelope may already have been polled by another caller, so
    /// envelopes set aside as unmatched are offered again.
    pub(crate) fn track(&mut self, function: &str, result: &Value) -> Result<Ticket> {
        let spec = operation::lookup(function)
            .ok_or_else(|| SdkError::Other(format!("{} does not complete asynchronously", function)))?;
        let ticket = match spec.id_key {
            Some(_) => {
                let raw = result
                    .as_i64()
                    .ok_or_else(|| SdkError::Other(format!("{} returned no request id", function)))?;
                self.correlator.track_raw(function, raw)?
            }
            None => self.correlator.track_tag(function)?,
        };
        self.rematch();
        Ok(ticket)
    }

    fn rematch(&mut self) {
        let waiting = std::mem::take(&mut self.unmatched);
        for envelope in waiting {
            match self.correlator.offer(&envelope) {
                Some(resolution) => self.keep_resolution(resolution),
                None => self.unmatched.push_back(envelope),
            }
        }
    }

    /// Feed polled envelopes through the correlator
    pub(crate) fn absorb(&mut self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            match self.correlator.offer(&envelope) {
                Some(resolution) => self.keep_resolution(resolution),
                None => {
                    if self.unmatched.len() >= self.limit {
                        self.unmatched.pop_front();
                        warn!(limit = self.limit, "Unmatched envelope dropped");
                    }
                    self.unmatched.push_back(envelope);
                }
            }
        }
    }

    fn keep_resolution(&mut self, resolution: Resolution) {
        self.resolved.insert(resolution.ticket, resolution);
        if self.resolved.len() > self.limit {
            if let Some((ticket, _)) = self.resolved.pop_first() {
                warn!(ticket = ticket.value(), "Unclaimed resolution dropped");
            }
        }
    }

    pub(crate) fn take(&mut self, ticket: Ticket) -> Option<Resolution> {
        self.resolved.remove(&ticket)
    }
}

/// GDK Bridge Client
///
/// Issues calls against the daemon and matches the envelopes it later
/// delivers back to the calls that caused them.
///
/// # Example
///
/// ```no_run
/// use gdkbridge_sdk::GdkBridgeClient;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GdkBridgeClient::connect("http://127.0.0.1:9600").await?;
/// let user = client.call("xboxone_get_activating_user", json!(null)).await?.result;
/// let ticket = client.issue("ms_iap_QueryGameLicense", json!({ "user": user })).await?;
/// let resolution = client.wait_for(ticket, Duration::from_secs(5)).await?;
/// println!("{:?}", resolution.outcome);
/// # Ok(())
/// # }
/// ```
pub struct GdkBridgeClient {
    client: HttpClient,
    tracker: Mutex<Tracker>,
    poll_interval: Duration,
}

impl GdkBridgeClient {
    /// Connect with default settings
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        Self::connect_with(url, ClientConfig::default()).await
    }

    pub async fn connect_with(url: impl AsRef<str>, config: ClientConfig) -> Result<Self> {
        let url = url.as_ref();
        let client = HttpClientBuilder::default()
            .request_timeout(config.request_timeout)
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            tracker: Mutex::new(Tracker::with_history(config.resolved_history)),
            poll_interval: config.poll_interval,
        })
    }

    fn tracker(&self) -> Result<MutexGuard<'_, Tracker>> {
        self.tracker
            .lock()
            .map_err(|_| SdkError::Other("tracker lock poisoned".to_string()))
    }

    /// Invoke a function and return its raw response
    pub async fn call(&self, function: &str, args: Value) -> Result<CallResponse> {
        let request = CallRequest {
            function: function.to_string(),
            args,
        };
        let response: CallResponse = self
            .client
            .request("gdk.call.v1", rpc_params![request])
            .await?;
        Ok(response)
    }

    /// Invoke an asynchronous function and start tracking its result
    ///
    /// A synchronous failure comes back as [`SdkError::CallFailed`] and
    /// nothing is tracked.
    pub async fn issue(&self, function: &str, args: Value) -> Result<Ticket> {
        let response = self.call(function, args).await?;
        if let Some(message) = response.error.clone() {
            return Err(SdkError::CallFailed {
                function: function.to_string(),
                code: response.code(),
                message,
            });
        }
        let ticket = self.tracker()?.track(function, &response.result)?;
        debug!(function, result = %response.result, ticket = ticket.value(), "Request issued");
        Ok(ticket)
    }

    /// Drain envelopes from the daemon without correlating them
    pub async fn poll(&self, max: Option<usize>) -> Result<Vec<Envelope>> {
        let response: PollResponse = self
            .client
            .request("events.poll.v1", rpc_params![PollRequest { max }])
            .await?;
        Ok(response.envelopes)
    }

    /// Poll once and correlate what arrived; returns the number of envelopes
    pub async fn pump(&self) -> Result<usize> {
        let envelopes = self.poll(None).await?;
        let count = envelopes.len();
        if count > 0 {
            trace!(count, "Envelopes polled");
            self.tracker()?.absorb(envelopes);
        }
        Ok(count)
    }

    /// Resolution of `ticket` if it has already arrived
    pub fn try_take(&self, ticket: Ticket) -> Result<Option<Resolution>> {
        Ok(self.tracker()?.take(ticket))
    }

    /// Poll until `ticket` resolves or `timeout` elapses
    pub async fn wait_for(&self, ticket: Ticket, timeout: Duration) -> Result<Resolution> {
        tokio::time::timeout(timeout, self.poll_until(ticket))
            .await
            .map_err(|_| SdkError::Timeout(ticket))?
    }

    async fn poll_until(&self, ticket: Ticket) -> Result<Resolution> {
        loop {
            if let Some(resolution) = self.try_take(ticket)? {
                return Ok(resolution);
            }
            if self.pump().await? == 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    /// Envelopes that answered no tracked request, oldest first
    pub fn take_unmatched(&self) -> Result<Vec<Envelope>> {
        Ok(self.tracker()?.unmatched.drain(..).collect())
    }

    pub fn pending_len(&self) -> Result<usize> {
        Ok(self.tracker()?.correlator.pending_len())
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self
            .client
            .request("admin.stats.v1", rpc_params![StatsRequest::default()])
            .await?;
        Ok(response)
    }
}
