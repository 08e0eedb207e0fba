//! One-shot capture sessions.
//!
//! A caller opens a [`CaptureScreen`] and awaits the [`PendingCapture`].
//! The camera thread pushes detection batches through the
//! [`DetectionSink`]; buttons and the file picker go through the
//! [`ScreenHandle`]. Whatever path finishes first closes the screen and
//! resolves the caller, with the scanned text or with `None`.
//!
//! ```text
//! camera thread ──► DetectionSink ──► throttle ──┐
//!                                                ├──► CaptureScreen ──► PendingCapture
//! buttons / picker ──► ScreenHandle ─────────────┘         │
//!                                                  ScreenHost (close, notify)
//! ```

mod feed;
mod host;
mod rendezvous;
mod screen;

pub use feed::{feed_frames, FeedSummary};
pub use host::{NavigationError, Notice, ScreenHost};
pub use rendezvous::{rendezvous, CaptureResult, CaptureSlot, PendingCapture, RendezvousState};
pub use screen::{
    CaptureScreen, ClosePath, DetectionSink, OpenedCapture, ScreenEvent, ScreenHandle,
    ScreenState, SessionError,
};
