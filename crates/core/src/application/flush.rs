// Stats Flush Scheduler
// Pushes stats manager values to the service on a fixed interval

use crate::application::constants::DEFAULT_STATS_FLUSH_INTERVAL;
use crate::application::shutdown::ShutdownToken;
use crate::application::xbox_live::LiveService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct StatsFlushScheduler {
    live: Arc<LiveService>,
    interval: Duration,
}

impl StatsFlushScheduler {
    pub fn new(live: Arc<LiveService>, interval: Duration) -> Self {
        Self { live, interval }
    }

    pub fn with_default_interval(live: Arc<LiveService>) -> Self {
        Self::new(live, DEFAULT_STATS_FLUSH_INTERVAL)
    }

    /// Flush loop; spawn with `tokio::spawn`. Returns after a final flush
    /// once shutdown is signalled.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(interval_secs = self.interval.as_secs(), "Stats flush scheduler started");

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.flush_now().await;
                }
                _ = shutdown.wait() => {
                    self.flush_now().await;
                    break;
                }
            }
        }
        info!("Stats flush scheduler stopped");
    }

    /// Returns the number of users flushed
    pub async fn flush_now(&self) -> usize {
        match self.live.flush_all().await {
            Ok(flushed) => {
                debug!(users = flushed, "Stats flushed");
                flushed
            }
            Err(e) => {
                error!(error = %e, "Stats flush failed");
                0
            }
        }
    }
}
