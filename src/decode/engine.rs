//! Ordered decode strategies for still images.

use super::reader::{readers_for, BarcodeReader};
use super::Bitmap;
use crate::capture::{ScanConfig, Symbology};
use image::GrayImage;
use std::fmt;
use std::time::{Duration, Instant};

/// A decode strategy, in the order the engine tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The unmodified bitmap.
    Direct,
    /// NTSC-weighted grayscale copy of the bitmap.
    Grayscale,
}

impl Strategy {
    /// Short label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Grayscale => "grayscale",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A successfully decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedValue {
    /// Trimmed, non-empty text.
    pub text: String,
    /// Symbology that produced it.
    pub format: Symbology,
}

/// Record of one strategy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub succeeded: bool,
    pub elapsed: Duration,
}

/// Everything the engine learned about one bitmap.
#[derive(Debug, Clone)]
pub struct DecodeReport {
    /// The decoded value, if any strategy succeeded.
    pub value: Option<DecodedValue>,
    /// Strategies in the order they ran.
    pub attempts: Vec<Attempt>,
    /// Formats every attempt tried.
    pub formats: Vec<Symbology>,
    /// Original bitmap width.
    pub width: u32,
    /// Original bitmap height.
    pub height: u32,
}

impl DecodeReport {
    /// Returns true if a value was decoded.
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }

    /// The attempt record for `strategy`, if it ran.
    pub fn attempt(&self, strategy: Strategy) -> Option<&Attempt> {
        self.attempts.iter().find(|a| a.strategy == strategy)
    }

    /// The strategy that produced the value.
    pub fn winning_strategy(&self) -> Option<Strategy> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| a.strategy)
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let outcome = if attempt.succeeded { "succeeded" } else { "failed" };
            write!(f, "{}={}", attempt.strategy, outcome)?;
        }
        Ok(())
    }
}

/// Still-image decoder with a fixed reader allow-list.
///
/// Direct decoding runs first. Only if it misses is the bitmap converted
/// to grayscale and decoded once more with the same readers.
pub struct DecodeEngine {
    readers: Vec<Box<dyn BarcodeReader>>,
}

impl DecodeEngine {
    /// Creates an engine for the configuration's format allow-list.
    pub fn new(config: &ScanConfig) -> Self {
        Self::with_readers(readers_for(config))
    }

    /// Creates an engine from explicit readers, tried in order.
    pub fn with_readers(readers: Vec<Box<dyn BarcodeReader>>) -> Self {
        Self { readers }
    }

    /// Formats this engine attempts.
    pub fn formats(&self) -> Vec<Symbology> {
        self.readers.iter().map(|r| r.format()).collect()
    }

    /// Decodes a bitmap, stopping at the first strategy that succeeds.
    pub fn decode(&self, bitmap: &Bitmap) -> DecodeReport {
        let mut report = DecodeReport {
            value: None,
            attempts: Vec::with_capacity(2),
            formats: self.formats(),
            width: bitmap.width(),
            height: bitmap.height(),
        };

        for strategy in [Strategy::Direct, Strategy::Grayscale] {
            let started = Instant::now();
            let luma = match strategy {
                Strategy::Direct => bitmap.luma(),
                Strategy::Grayscale => bitmap.to_grayscale().luma(),
            };
            let value = self.decode_luma(&luma);
            let attempt = Attempt {
                strategy,
                succeeded: value.is_some(),
                elapsed: started.elapsed(),
            };
            tracing::debug!(
                strategy = %strategy,
                succeeded = attempt.succeeded,
                elapsed_us = attempt.elapsed.as_micros() as u64,
                "Decode attempt finished"
            );
            report.attempts.push(attempt);

            if value.is_some() {
                report.value = value;
                return report;
            }
        }

        tracing::info!(
            width = report.width,
            height = report.height,
            formats = ?report.formats,
            "No symbol found in picked image"
        );
        report
    }

    /// Runs every reader against one luminance image.
    pub fn decode_luma(&self, luma: &GrayImage) -> Option<DecodedValue> {
        self.readers.iter().find_map(|reader| {
            let text = reader.read(luma)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(DecodedValue {
                text: trimmed.to_string(),
                format: reader.format(),
            })
        })
    }
}

impl Default for DecodeEngine {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl fmt::Debug for DecodeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeEngine")
            .field("formats", &self.formats())
            .finish()
    }
}
