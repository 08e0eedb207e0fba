//! Rate limit and drop-on-contention guard for detection callbacks.

use crate::capture::{Detection, DetectionEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sentinel for "nothing accepted yet".
const NEVER: u64 = u64::MAX;

/// Outcome of offering one detection batch to the throttle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The batch was accepted and carried a usable candidate.
    /// Detection is now disarmed until [`DetectionThrottle::rearm`].
    Accepted(Detection),
    /// The batch was accepted but held no non-empty value.
    Empty,
    /// Another batch was being decided at the same moment.
    Busy,
    /// The batch arrived inside the minimum interval.
    TooSoon,
    /// A result was already produced for this session.
    Disarmed,
}

impl Verdict {
    /// True when the batch passed the interval and guard checks.
    pub fn is_processed(&self) -> bool {
        matches!(self, Verdict::Accepted(_) | Verdict::Empty)
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accepted(_) => "accepted",
            Verdict::Empty => "empty",
            Verdict::Busy => "busy",
            Verdict::TooSoon => "too_soon",
            Verdict::Disarmed => "disarmed",
        }
    }
}

/// Throttle and guard owned by a single capture screen.
///
/// Frame callbacks arrive on the camera's own thread at tens of events per
/// second. `offer` never blocks: contention, early arrival and a finished
/// session all resolve to a dropped batch.
#[derive(Debug)]
pub struct DetectionThrottle {
    min_interval: Duration,
    origin: Instant,
    /// Held while one batch is being decided.
    busy: AtomicBool,
    /// Nanoseconds since `origin` of the last accepted batch.
    last_accepted: AtomicU64,
    armed: AtomicBool,
}

/// Releases the busy flag on every exit path, unwinding included.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl DetectionThrottle {
    /// Creates an armed throttle with the given minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            origin: Instant::now(),
            busy: AtomicBool::new(false),
            last_accepted: AtomicU64::new(NEVER),
            armed: AtomicBool::new(true),
        }
    }

    /// Returns the configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Offers a batch stamped with its own arrival time.
    pub fn offer(&self, event: &DetectionEvent) -> Verdict {
        let verdict = self.decide(event);
        tracing::trace!(
            sequence = event.sequence(),
            verdict = verdict.label(),
            "Detection batch offered"
        );
        verdict
    }

    fn decide(&self, event: &DetectionEvent) -> Verdict {
        if !self.is_armed() {
            return Verdict::Disarmed;
        }
        let Some(_guard) = self.try_enter() else {
            return Verdict::Busy;
        };
        // A concurrent winner may have disarmed between the check above
        // and acquiring the guard.
        if !self.is_armed() {
            return Verdict::Disarmed;
        }

        let now = self.nanos_since_origin(event.timestamp());
        let last = self.last_accepted.load(Ordering::Acquire);
        // Out-of-order timestamps saturate to zero elapsed and are dropped.
        if last != NEVER && now.saturating_sub(last) < self.min_interval.as_nanos() as u64 {
            return Verdict::TooSoon;
        }
        self.last_accepted.store(now, Ordering::Release);

        match event.first_candidate() {
            Some((value, format)) => {
                self.armed.store(false, Ordering::Release);
                Verdict::Accepted(Detection::new(value, format))
            }
            None => Verdict::Empty,
        }
    }

    /// Re-enables detection after a result was produced or discarded.
    ///
    /// The interval window is kept, so a batch arriving right after
    /// re-arming is still subject to the minimum spacing.
    pub fn rearm(&self) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Detection re-armed");
        }
    }

    /// Stops accepting batches until re-armed.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// Whether batches can currently be accepted.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    fn try_enter(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    fn nanos_since_origin(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.origin)
            .as_nanos()
            .min(u128::from(NEVER - 1)) as u64
    }
}

impl Default for DetectionThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(60))
    }
}
