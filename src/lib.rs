//! Scanpoint Library
//!
//! A one-shot barcode and QR capture session. A caller opens a capture
//! screen and suspends until it yields a single scanned string, or
//! nothing if the user backs out.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture (frame source) → throttle → session → caller
//!                                        ↑
//!               picked image → decode ───┘
//!                     ↓
//!              metrics (counters)
//! ```
//!
//! # Design Principles
//!
//! - **One result per request**: the first path to finish wins and every
//!   later path is a no-op
//! - **Never block the camera**: detection batches are dropped, not queued,
//!   while a decision is in flight
//! - **Misses are not errors**: a picked image without a symbol re-arms
//!   live detection instead of failing the session
//!
//! # Example
//!
//! ```no_run
//! use scanpoint::{
//!     capture::{Detection, DetectionEvent, ScanConfig, Symbology},
//!     metrics::ScanMetrics,
//!     session::{CaptureScreen, NavigationError, Notice, OpenedCapture, ScreenHost},
//! };
//! use std::sync::Arc;
//!
//! struct Host;
//!
//! impl ScreenHost for Host {
//!     fn close_capture_screen(&mut self) -> Result<(), NavigationError> {
//!         Ok(())
//!     }
//!     fn notify(&mut self, notice: Notice) {
//!         eprintln!("{notice}");
//!     }
//! }
//!
//! # async fn demo() {
//! let metrics = Arc::new(ScanMetrics::new().unwrap());
//! let OpenedCapture { screen, sink, pending, .. } =
//!     CaptureScreen::open(&ScanConfig::default(), Host, metrics);
//! let ui = tokio::spawn(screen.run());
//!
//! sink.on_frame(&DetectionEvent::new(vec![Detection::new("LOC-A1", Symbology::Qr)], 1));
//!
//! assert_eq!(pending.wait().await, Some("LOC-A1".to_string()));
//! ui.await.unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod metrics;
pub mod session;
pub mod throttle;

// Re-export commonly used types at crate root
pub use capture::{Detection, DetectionEvent, FrameSource, MockFrameSource, ScanConfig, Symbology};
pub use decode::{Bitmap, DecodeEngine, DecodeReport, Strategy};
pub use metrics::ScanMetrics;
pub use session::{CaptureScreen, ClosePath, PendingCapture, ScreenHandle, ScreenHost};
pub use throttle::{DetectionThrottle, Verdict};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
