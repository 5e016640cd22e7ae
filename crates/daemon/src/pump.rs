// Update pump - watches the inbox between client polls

use gdkbridge_core::application::constants::MAX_POLL_BATCH;
use gdkbridge_core::application::{Runtime, ShutdownToken};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Envelopes stay queued for clients; the pump only reports a backlog
/// once it grows past one poll batch, and again each time it doubles.
pub async fn run(runtime: Arc<Runtime>, interval: Duration, mut shutdown: ShutdownToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut threshold = MAX_POLL_BATCH as u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.wait() => break,
        }

        let queued = match runtime.stats() {
            Ok(stats) => stats.queued_envelopes,
            Err(e) => {
                warn!(error = %e, "Failed to read runtime stats");
                continue;
            }
        };
        if queued >= threshold {
            warn!(queued, "Envelopes are piling up; is a client polling?");
            threshold = threshold.saturating_mul(2);
        } else if queued < MAX_POLL_BATCH as u64 {
            threshold = MAX_POLL_BATCH as u64;
        }
    }
    debug!("Update pump stopped");
}
