//! Capture session configuration.
//!
//! The detection interval bounds how often the frame callback may hand
//! a candidate to the session; the format allow-list bounds what the
//! still-image decoder will try.

use super::{Facing, Symbology};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Formats the still-image decoder knows how to read.
pub const DECODABLE_FORMATS: [Symbology; 3] =
    [Symbology::Code128, Symbology::Code39, Symbology::Qr];

/// Configuration for one capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum time between two accepted detection batches, in milliseconds.
    pub min_interval_ms: u64,
    /// Decode allow-list for picked images.
    pub formats: Vec<Symbology>,
    /// Number of scanlines swept by the linear readers.
    pub scan_rows: u32,
    /// Luminance below which a pixel counts as ink for the linear readers.
    pub ink_threshold: u8,
    /// Camera selected when the session opens.
    pub facing: Facing,
    /// Torch state when the session opens.
    pub torch: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 60,
            formats: DECODABLE_FORMATS.to_vec(),
            scan_rows: 9,
            ink_threshold: 128,
            facing: Facing::Rear,
            torch: false,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with the given detection interval.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: min_interval.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Minimum detection interval as a `Duration`.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_interval_ms == 0 || self.min_interval_ms > 10_000 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.formats.is_empty() {
            return Err(ConfigError::EmptyFormats);
        }
        if let Some(format) = self
            .formats
            .iter()
            .find(|f| !DECODABLE_FORMATS.contains(f))
        {
            return Err(ConfigError::UnsupportedFormat(*format));
        }
        if self.scan_rows == 0 || self.scan_rows > 64 {
            return Err(ConfigError::InvalidScanRows);
        }
        if self.ink_threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid detection interval (must be 1-10000 ms)")]
    InvalidInterval,
    #[error("format allow-list is empty")]
    EmptyFormats,
    #[error("format {0} cannot be decoded from still images")]
    UnsupportedFormat(Symbology),
    #[error("invalid scan row count (must be 1-64)")]
    InvalidScanRows,
    #[error("ink threshold must be above zero")]
    InvalidThreshold,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration for the command-line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the decode attempt log after each gallery decode.
    pub show_attempts: bool,
    /// Dump Prometheus metrics when the session ends.
    pub dump_metrics: bool,
    /// Delay between simulated frames, in milliseconds.
    pub frame_delay_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_attempts: true,
            dump_metrics: false,
            frame_delay_ms: 20,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.scan.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_interval(), Duration::from_millis(60));
    }

    #[test]
    fn test_zero_interval_invalid() {
        let config = ScanConfig::with_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval)
        ));
    }

    #[test]
    fn test_undecodable_format_rejected() {
        let config = ScanConfig {
            formats: vec![Symbology::Qr, Symbology::Pdf417],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedFormat(Symbology::Pdf417))
        ));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            [scan]
            min_interval_ms = 100
            formats = ["qr", "code128"]
            facing = "front"

            [output]
            dump_metrics = true
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.min_interval_ms, 100);
        assert_eq!(config.scan.formats, vec![Symbology::Qr, Symbology::Code128]);
        assert_eq!(config.scan.facing, Facing::Front);
        assert_eq!(config.scan.scan_rows, 9);
        assert!(config.output.dump_metrics);
        assert!(config.output.show_attempts);
    }

    #[test]
    fn test_invalid_file_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[scan]\nscan_rows = 0\n"),
            Err(ConfigError::InvalidScanRows)
        ));
        assert!(matches!(
            FileConfig::from_toml("[scan\n"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
