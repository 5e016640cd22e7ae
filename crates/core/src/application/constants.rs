// Application constants
use std::time::Duration;

/// How often the stats manager pushes values to the service (5 minutes)
pub const DEFAULT_STATS_FLUSH_INTERVAL: Duration = Duration::from_secs(300);

/// Update pump period, roughly one frame at 60 Hz
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(16);

/// Upper bound on envelopes returned by a single poll
pub const MAX_POLL_BATCH: usize = 1000;

/// Largest buffer the pool will allocate or grow to, matching the largest save blob
pub const MAX_BUFFER_BYTES: usize = 16 * 1024 * 1024;
