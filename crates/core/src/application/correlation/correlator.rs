// Correlator - consumer-side table of pending requests

use crate::domain::operation::{self, OperationSpec, Outcome};
use crate::domain::{DomainError, Envelope, RequestId, RequestState};
use crate::error::{AppError, Result};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Default number of resolved ids remembered for duplicate suppression
pub const DEFAULT_RESOLVED_HISTORY: usize = 1024;

/// Handle for one tracked request, ordered by issue time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A tracked request matched by an envelope
#[derive(Debug, Clone)]
pub struct Resolution {
    pub ticket: Ticket,
    pub function: &'static str,
    pub request_id: Option<RequestId>,
    pub outcome: Outcome,
    pub envelope: Envelope,
}

struct PendingEntry {
    ticket: Ticket,
    spec: &'static OperationSpec,
    request_id: Option<RequestId>,
    state: RequestState,
}

/// Pending → Resolved bookkeeping for issued requests.
///
/// Each envelope resolves at most one entry: the earliest-issued pending
/// entry it matches. Envelopes matching nothing, and repeats for ids that
/// were already resolved, leave the table untouched.
pub struct Correlator {
    pending: Vec<PendingEntry>,
    resolved: VecDeque<RequestId>,
    resolved_set: HashSet<RequestId>,
    history: usize,
    next_ticket: u64,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVED_HISTORY)
    }
}

impl Correlator {
    /// `history` bounds how many resolved ids are remembered
    pub fn new(history: usize) -> Self {
        Self {
            pending: Vec::new(),
            resolved: VecDeque::new(),
            resolved_set: HashSet::new(),
            history: history.max(1),
            next_ticket: 0,
        }
    }

    /// Track an id returned by an asynchronous function
    pub fn track(&mut self, function: &str, id: RequestId) -> Result<Ticket> {
        let spec = Self::spec(function)?;
        if spec.id_key.is_none() {
            return Err(AppError::Validation(format!(
                "{} results carry no request id; track it by tag",
                function
            )));
        }
        if self.state(id).is_some() {
            return Err(AppError::Conflict(format!("request {} already tracked", id)));
        }
        Ok(self.push(spec, Some(id)))
    }

    /// Track the raw value returned by an issuing call; negative sentinels are rejected
    pub fn track_raw(&mut self, function: &str, raw: i64) -> Result<Ticket> {
        let id = RequestId::new(raw).ok_or(DomainError::InvalidRequestId(raw))?;
        self.track(function, id)
    }

    /// Track a function whose result is recognised by its discriminant alone
    pub fn track_tag(&mut self, function: &str) -> Result<Ticket> {
        let spec = Self::spec(function)?;
        Ok(self.push(spec, None))
    }

    /// Offer an envelope; returns the resolution it caused, if any
    pub fn offer(&mut self, envelope: &Envelope) -> Option<Resolution> {
        let carried = envelope.request_id();
        let duplicate = carried.is_some_and(|id| self.resolved_set.contains(&id));

        let position = self.pending.iter().position(|entry| {
            if entry.request_id.is_none() && duplicate {
                return false;
            }
            entry.spec.matches(envelope, entry.request_id)
        });

        let Some(position) = position else {
            trace!(
                channel = %envelope.channel,
                request_id = ?carried,
                duplicate,
                "Envelope matched no pending request"
            );
            return None;
        };

        let mut entry = self.pending.remove(position);
        if let Err(e) = entry.state.resolve() {
            debug!(error = %e, "Pending entry was not pending");
        }

        let request_id = entry.request_id.or(carried);
        if let Some(id) = request_id {
            self.remember(id);
        }

        let outcome = entry.spec.outcome(envelope);
        debug!(
            function = %entry.spec.function,
            request_id = ?request_id,
            outcome = ?outcome,
            "Request resolved"
        );

        Some(Resolution {
            ticket: entry.ticket,
            function: entry.spec.function,
            request_id,
            outcome,
            envelope: envelope.clone(),
        })
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.iter().any(|e| e.request_id == Some(id))
    }

    /// State of an id; `None` if never tracked or forgotten from history
    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        if let Some(entry) = self.pending.iter().find(|e| e.request_id == Some(id)) {
            return Some(entry.state);
        }
        self.resolved_set
            .contains(&id)
            .then_some(RequestState::Resolved)
    }

    pub fn is_ticket_pending(&self, ticket: Ticket) -> bool {
        self.pending.iter().any(|e| e.ticket == ticket)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn spec(function: &str) -> Result<&'static OperationSpec> {
        operation::lookup(function)
            .ok_or_else(|| DomainError::UnknownOperation(function.to_string()).into())
    }

    fn push(&mut self, spec: &'static OperationSpec, request_id: Option<RequestId>) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(PendingEntry {
            ticket,
            spec,
            request_id,
            state: RequestState::Pending,
        });
        ticket
    }

    fn remember(&mut self, id: RequestId) {
        if self.resolved_set.insert(id) {
            self.resolved.push_back(id);
        }
        while self.resolved.len() > self.history {
            if let Some(oldest) = self.resolved.pop_front() {
                self.resolved_set.remove(&oldest);
            }
        }
    }
}
