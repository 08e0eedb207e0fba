//! Prometheus metrics for capture sessions.
//!
//! # Metrics Exposed
//!
//! - `scanpoint_detection_batches_total{verdict}` - Detection batches by throttle verdict
//! - `scanpoint_decode_attempts_total{strategy,outcome}` - Still-image decode attempts
//! - `scanpoint_captures_total{path,outcome}` - Finished capture requests by closing path
//! - `scanpoint_detection_armed` - Whether live detection is currently armed (1/0)
//!
//! # Example
//!
//! ```no_run
//! use scanpoint::metrics::ScanMetrics;
//!
//! let metrics = ScanMetrics::new().expect("Failed to create registry");
//! metrics.set_armed(true);
//! println!("{}", metrics.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsSnapshot, ScanMetrics};
