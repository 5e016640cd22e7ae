// Async Issuer - id allocation and background completion shared by services

use crate::application::correlation::EventSender;
use crate::domain::{Envelope, RequestId};
use crate::error::{AppError, Result};
use crate::port::IdProvider;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Everything an issuing call needs: an id source, the event queue, a
/// runtime to complete on, and the runtime's running flag.
#[derive(Clone)]
pub struct AsyncIssuer {
    ids: Arc<dyn IdProvider>,
    events: EventSender,
    handle: Handle,
    running: Arc<AtomicBool>,
}

impl AsyncIssuer {
    pub fn new(ids: Arc<dyn IdProvider>, events: EventSender, handle: Handle) -> Self {
        Self {
            ids,
            events,
            handle,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::NotInitialized)
        }
    }

    /// Allocate a request id. Call only after synchronous validation passed.
    pub fn issue(&self) -> Result<RequestId> {
        self.ensure_running()?;
        Ok(self.ids.next_request_id())
    }

    /// Run `work` in the background and post the envelope it produces
    pub fn complete<F>(&self, work: F)
    where
        F: Future<Output = Envelope> + Send + 'static,
    {
        let events = self.events.clone();
        self.handle.spawn(async move {
            events.post(work.await);
        });
    }

    /// Run `work` in the background; it posts whatever envelopes it needs
    pub fn spawn_with_events<F, Fut>(&self, work: F)
    where
        F: FnOnce(EventSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(work(self.events.clone()));
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn issued(&self) -> u64 {
        self.ids.issued()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
