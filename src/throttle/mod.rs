//! Detection throttling.
//!
//! Frame sources deliver detection batches far faster than a capture
//! screen can act on them. The throttle admits at most one batch per
//! interval, drops batches that race an in-flight decision, and stops
//! admitting anything once a result has been produced.

mod guard;

pub use guard::{DetectionThrottle, Verdict};
