//! Metrics collection and registry.

use crate::decode::DecodeReport;
use crate::session::ClosePath;
use crate::throttle::Verdict;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

const VERDICTS: [&str; 5] = ["accepted", "empty", "busy", "too_soon", "disarmed"];

/// Totals read back from the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batches that passed the throttle.
    pub batches_processed: u64,
    /// Batches dropped by the throttle for any reason.
    pub batches_dropped: u64,
    /// Still-image decode attempts.
    pub decode_attempts: u64,
    /// Capture requests finished with a value.
    pub captures_with_value: u64,
    /// Capture requests finished without a value.
    pub captures_without_value: u64,
}

/// Prometheus metrics registry for capture sessions.
pub struct ScanMetrics {
    registry: Registry,
    batches: IntCounterVec,
    decode_attempts: IntCounterVec,
    captures: IntCounterVec,
    armed: IntGauge,
}

impl ScanMetrics {
    /// Creates a new registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let batches = IntCounterVec::new(
            Opts::new(
                "scanpoint_detection_batches_total",
                "Detection batches offered to the throttle, by verdict",
            ),
            &["verdict"],
        )?;
        let decode_attempts = IntCounterVec::new(
            Opts::new(
                "scanpoint_decode_attempts_total",
                "Still-image decode attempts, by strategy and outcome",
            ),
            &["strategy", "outcome"],
        )?;
        let captures = IntCounterVec::new(
            Opts::new(
                "scanpoint_captures_total",
                "Finished capture requests, by closing path and outcome",
            ),
            &["path", "outcome"],
        )?;
        let armed = IntGauge::new(
            "scanpoint_detection_armed",
            "Whether live detection is armed (1=armed, 0=disarmed)",
        )?;

        registry.register(Box::new(batches.clone()))?;
        registry.register(Box::new(decode_attempts.clone()))?;
        registry.register(Box::new(captures.clone()))?;
        registry.register(Box::new(armed.clone()))?;

        Ok(Self {
            registry,
            batches,
            decode_attempts,
            captures,
            armed,
        })
    }

    /// Counts one throttle decision.
    pub fn record_verdict(&self, verdict: &Verdict) {
        self.batches.with_label_values(&[verdict.label()]).inc();
    }

    /// Counts every attempt in a decode report.
    pub fn record_report(&self, report: &DecodeReport) {
        for attempt in &report.attempts {
            let outcome = if attempt.succeeded { "hit" } else { "miss" };
            self.decode_attempts
                .with_label_values(&[attempt.strategy.label(), outcome])
                .inc();
        }
    }

    /// Counts a finished capture request.
    pub fn record_capture(&self, path: ClosePath, delivered_value: bool) {
        let outcome = if delivered_value { "value" } else { "none" };
        self.captures
            .with_label_values(&[path.label(), outcome])
            .inc();
    }

    /// Tracks whether live detection is armed.
    pub fn set_armed(&self, armed: bool) {
        self.armed.set(if armed { 1 } else { 0 });
    }

    /// Reads totals back out of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let verdict = |label: &str| self.batches.with_label_values(&[label]).get();
        let batches_processed = verdict("accepted") + verdict("empty");
        let batches_dropped = VERDICTS.iter().map(|v| verdict(*v)).sum::<u64>() - batches_processed;

        let mut snapshot = MetricsSnapshot {
            batches_processed,
            batches_dropped,
            ..Default::default()
        };
        for family in self.registry.gather() {
            for metric in family.get_metric() {
                let value = metric.get_counter().get_value() as u64;
                match family.get_name() {
                    "scanpoint_decode_attempts_total" => snapshot.decode_attempts += value,
                    "scanpoint_captures_total" => {
                        let delivered = metric
                            .get_label()
                            .iter()
                            .any(|l| l.get_name() == "outcome" && l.get_value() == "value");
                        if delivered {
                            snapshot.captures_with_value += value;
                        } else {
                            snapshot.captures_without_value += value;
                        }
                    }
                    _ => {}
                }
            }
        }
        snapshot
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for ScanMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
