//! Fulfill-once handoff between a capture screen and its caller.
//!
//! The writer half ([`CaptureSlot`]) may be cloned into every path that
//! can end the capture: live detection, gallery decode, cancel, back
//! navigation. The first `fulfill` wins; later ones are no-ops. The reader
//! half ([`PendingCapture`]) suspends without blocking until a result is
//! in place.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

/// What the caller receives: the scanned text, or nothing on cancellation.
pub type CaptureResult = Option<String>;

/// Observable state of a rendezvous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendezvousState {
    /// Created, awaiting a result.
    Armed,
    /// Terminal.
    Fulfilled(CaptureResult),
}

#[derive(Debug)]
struct Shared {
    result: OnceLock<CaptureResult>,
    ready: Notify,
    writers: AtomicUsize,
}

impl Shared {
    fn fulfill(&self, result: CaptureResult) -> bool {
        if self.result.set(result).is_err() {
            return false;
        }
        // Single reader: a stored permit covers a reader that has not
        // started waiting yet.
        self.ready.notify_one();
        true
    }

    fn state(&self) -> RendezvousState {
        match self.result.get() {
            Some(result) => RendezvousState::Fulfilled(result.clone()),
            None => RendezvousState::Armed,
        }
    }
}

/// Creates an armed rendezvous.
pub fn rendezvous() -> (CaptureSlot, PendingCapture) {
    let shared = Arc::new(Shared {
        result: OnceLock::new(),
        ready: Notify::new(),
        writers: AtomicUsize::new(1),
    });
    (
        CaptureSlot {
            shared: Arc::clone(&shared),
        },
        PendingCapture { shared },
    )
}

/// Writer half. Dropping the last clone of an unfulfilled slot resolves
/// the caller with `None`.
#[derive(Debug)]
pub struct CaptureSlot {
    shared: Arc<Shared>,
}

impl CaptureSlot {
    /// Fulfills the rendezvous. Returns `true` if this call was the first.
    pub fn fulfill(&self, result: CaptureResult) -> bool {
        let won = self.shared.fulfill(result);
        if won {
            tracing::debug!("Capture rendezvous fulfilled");
        } else {
            tracing::trace!("Capture rendezvous already fulfilled; ignoring");
        }
        won
    }

    /// Current state.
    pub fn state(&self) -> RendezvousState {
        self.shared.state()
    }

    /// Returns true once any writer has fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        self.shared.result.get().is_some()
    }
}

impl Clone for CaptureSlot {
    fn clone(&self) -> Self {
        self.shared.writers.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        if self.shared.writers.fetch_sub(1, Ordering::AcqRel) == 1 && self.shared.fulfill(None) {
            tracing::warn!("Capture screen dropped without a result; caller resolved with none");
        }
    }
}

/// Reader half, held by whoever opened the capture screen.
#[derive(Debug)]
pub struct PendingCapture {
    shared: Arc<Shared>,
}

impl PendingCapture {
    /// Waits until the rendezvous is fulfilled and returns the result.
    ///
    /// There is no built-in timeout; wrap in `tokio::time::timeout` if
    /// the caller needs one.
    pub async fn wait(self) -> CaptureResult {
        loop {
            if let Some(result) = self.shared.result.get() {
                return result.clone();
            }
            self.shared.ready.notified().await;
        }
    }

    /// Returns the result without waiting, if already fulfilled.
    pub fn try_result(&self) -> Option<CaptureResult> {
        self.shared.result.get().cloned()
    }

    /// Current state.
    pub fn state(&self) -> RendezvousState {
        self.shared.state()
    }
}
