// ID Provider Port (request id allocation)

use crate::domain::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request id allocator (allows deterministic ids in tests)
pub trait IdProvider: Send + Sync {
    /// Allocate a new request id, unique for the life of the process
    fn next_request_id(&self) -> RequestId;

    /// Number of ids handed out so far
    fn issued(&self) -> u64;
}

/// Monotonic counter starting at 0 (production)
#[derive(Default)]
pub struct SequentialIdProvider {
    next: AtomicU64,
}

impl SequentialIdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdProvider for SequentialIdProvider {
    fn next_request_id(&self) -> RequestId {
        RequestId::from_counter(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
