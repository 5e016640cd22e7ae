// Request Identifier Domain Model

use serde::{Deserialize, Serialize};

/// Returned instead of a request id when a call fails synchronously
pub const SENTINEL_ERROR: i64 = -1;

/// Returned when the Xbox Live context for a user could not be retrieved
pub const SENTINEL_NO_CONTEXT: i64 = -2;

/// Opaque handle correlating an initiating call with its later envelope.
///
/// Always non-negative; negative values are reserved for the synchronous
/// failure sentinels and are never wrapped in a `RequestId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(i64);

impl RequestId {
    /// Wrap a raw id. Returns `None` for negative (sentinel) values.
    pub fn new(raw: i64) -> Option<Self> {
        (raw >= 0).then_some(Self(raw))
    }

    /// Id from an allocation counter, saturating at `i64::MAX`
    pub(crate) fn from_counter(counter: u64) -> Self {
        Self(i64::try_from(counter).unwrap_or(i64::MAX))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request lifecycle: issued requests are pending until the first matching
/// envelope arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Pending,
    Resolved,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Pending => write!(f, "PENDING"),
            RequestState::Resolved => write!(f, "RESOLVED"),
        }
    }
}

impl RequestState {
    /// Transition Pending -> Resolved
    pub fn resolve(&mut self) -> crate::domain::error::Result<()> {
        if *self != RequestState::Pending {
            return Err(crate::domain::error::DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: "RESOLVED".to_string(),
            });
        }
        *self = RequestState::Resolved;
        Ok(())
    }
}
