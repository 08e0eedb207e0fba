//! Detection batches delivered by the frame source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Barcode encoding standard tagging a decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    /// Code 128 (sets A/B/C).
    Code128,
    /// Code 39 (3 of 9).
    Code39,
    /// Code 93.
    Code93,
    /// Codabar.
    Codabar,
    /// EAN-13.
    Ean13,
    /// EAN-8.
    Ean8,
    /// UPC-A.
    UpcA,
    /// UPC-E.
    UpcE,
    /// Interleaved 2 of 5.
    Itf,
    /// QR code.
    Qr,
    /// Data Matrix.
    DataMatrix,
    /// PDF417.
    Pdf417,
    /// Aztec.
    Aztec,
}

impl Symbology {
    /// Returns true for one-dimensional (linear) symbologies.
    pub fn is_linear(self) -> bool {
        !matches!(
            self,
            Symbology::Qr | Symbology::DataMatrix | Symbology::Pdf417 | Symbology::Aztec
        )
    }

    /// Short lowercase label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Symbology::Code128 => "code128",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Codabar => "codabar",
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Itf => "itf",
            Symbology::Qr => "qr",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Pdf417 => "pdf417",
            Symbology::Aztec => "aztec",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One decoded candidate inside a detection batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Raw decoded text as reported by the frame source.
    pub value: String,
    /// Symbology the value was read from.
    pub format: Symbology,
}

impl Detection {
    /// Creates a detection.
    pub fn new(value: impl Into<String>, format: Symbology) -> Self {
        Self {
            value: value.into(),
            format,
        }
    }

    /// Returns the trimmed value, or `None` when nothing but whitespace remains.
    pub fn candidate(&self) -> Option<&str> {
        let trimmed = self.value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Results produced from a single camera frame.
///
/// A batch may be empty; frame sources report every analysed frame
/// whether or not anything was found.
#[derive(Clone)]
pub struct DetectionEvent {
    detections: Vec<Detection>,
    /// Arrival timestamp used by the throttle.
    timestamp: Instant,
    /// Monotonic frame sequence number.
    sequence: u64,
}

impl DetectionEvent {
    /// Creates an event stamped with the current instant.
    pub fn new(detections: Vec<Detection>, sequence: u64) -> Self {
        Self::at(detections, sequence, Instant::now())
    }

    /// Creates an event with an explicit arrival timestamp.
    pub fn at(detections: Vec<Detection>, sequence: u64, timestamp: Instant) -> Self {
        Self {
            detections,
            timestamp,
            sequence,
        }
    }

    /// Returns the detections in frame order.
    #[inline]
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Returns the arrival timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true if the batch carries no detections at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// First detection whose trimmed value is non-empty.
    pub fn first_candidate(&self) -> Option<(&str, Symbology)> {
        self.detections
            .iter()
            .find_map(|d| d.candidate().map(|value| (value, d.format)))
    }
}

impl fmt::Debug for DetectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionEvent")
            .field("sequence", &self.sequence)
            .field("detections", &self.detections.len())
            .finish()
    }
}
