// Async Correlation Layer
//
// Issuing calls hand out request ids; results arrive later as envelopes on
// one shared inbox. The correlator matches them back up.

mod correlator;
mod event_queue;

pub use correlator::{Correlator, Resolution, Ticket, DEFAULT_RESOLVED_HISTORY};
pub use event_queue::{event_queue, EventSender, Inbox};
