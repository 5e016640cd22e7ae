// Event Queue - shared FIFO inbox of envelopes

use crate::domain::Envelope;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct Counters {
    posted: AtomicU64,
    delivered: AtomicU64,
}

/// Producer half; cloned into every service that completes requests
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Envelope>,
    counters: Arc<Counters>,
}

impl EventSender {
    /// Enqueue an envelope. Never blocks; dropped once the inbox is gone.
    pub fn post(&self, envelope: Envelope) {
        let channel = envelope.channel;
        match self.tx.send(envelope) {
            Ok(()) => {
                self.counters.posted.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                debug!(channel = %channel, "Inbox closed, envelope dropped");
            }
        }
    }
}

/// Consumer half, drained once per update step
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
    counters: Arc<Counters>,
}

impl Inbox {
    /// Everything queued so far, in delivery order
    pub fn drain(&mut self) -> Vec<Envelope> {
        self.drain_up_to(usize::MAX)
    }

    pub fn drain_up_to(&mut self, max: usize) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        while envelopes.len() < max {
            match self.rx.try_recv() {
                Ok(envelope) => envelopes.push(envelope),
                Err(_) => break,
            }
        }
        self.counters
            .delivered
            .fetch_add(envelopes.len() as u64, Ordering::Relaxed);
        envelopes
    }

    /// Wait for the next envelope; `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<Envelope> {
        let envelope = self.rx.recv().await?;
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        Some(envelope)
    }

    /// Envelopes posted but not yet drained
    pub fn pending_len(&self) -> u64 {
        let posted = self.counters.posted.load(Ordering::Relaxed);
        let delivered = self.counters.delivered.load(Ordering::Relaxed);
        posted.saturating_sub(delivered)
    }

    pub fn delivered(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }
}

/// Create a connected sender/inbox pair
pub fn event_queue() -> (EventSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let counters = Arc::new(Counters::default());
    (
        EventSender {
            tx,
            counters: Arc::clone(&counters),
        },
        Inbox { rx, counters },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AsyncChannel;

    fn envelope(id: i64) -> Envelope {
        Envelope::new(AsyncChannel::SaveLoad).with("id", id)
    }

    #[test]
    fn test_drain_is_fifo() {
        let (tx, mut inbox) = event_queue();
        for id in 0..5 {
            tx.post(envelope(id));
        }
        assert_eq!(inbox.pending_len(), 5);

        let ids: Vec<_> = inbox
            .drain()
            .iter()
            .filter_map(|e| e.get_i64("id"))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(inbox.pending_len(), 0);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_drain_up_to() {
        let (tx, mut inbox) = event_queue();
        for id in 0..3 {
            tx.post(envelope(id));
        }
        assert_eq!(inbox.drain_up_to(2).len(), 2);
        assert_eq!(inbox.pending_len(), 1);
        assert_eq!(inbox.delivered(), 2);
    }

    #[test]
    fn test_post_after_inbox_dropped_is_silent() {
        let (tx, inbox) = event_queue();
        drop(inbox);
        tx.post(envelope(1));
    }

    #[tokio::test]
    async fn test_recv_across_tasks() {
        let (tx, mut inbox) = event_queue();
        let producer = tx.clone();
        tokio::spawn(async move {
            producer.post(envelope(42));
        });
        let received = inbox.recv().await.unwrap();
        assert_eq!(received.get_i64("id"), Some(42));
    }
}
