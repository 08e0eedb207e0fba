//! Symbology readers.
//!
//! Every reader sees the same 8-bit luminance view of a bitmap and
//! either returns the decoded text or nothing. Misses are ordinary.

use super::code128::Code128Reader;
use super::code39::Code39Reader;
use crate::capture::{ScanConfig, Symbology};
use image::GrayImage;
use rqrr::PreparedImage;

/// Trait for single-symbology readers.
pub trait BarcodeReader: Send + Sync {
    /// The symbology this reader decodes.
    fn format(&self) -> Symbology;

    /// Attempts to decode one symbol from a luminance image.
    fn read(&self, luma: &GrayImage) -> Option<String>;
}

/// QR reader backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrReader;

impl BarcodeReader for QrReader {
    fn format(&self) -> Symbology {
        Symbology::Qr
    }

    fn read(&self, luma: &GrayImage) -> Option<String> {
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        let mut prepared = PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| luma.get_pixel(x as u32, y as u32)[0],
        );
        prepared.detect_grids().iter().find_map(|grid| match grid.decode() {
            Ok((_, content)) => Some(content),
            Err(e) => {
                tracing::trace!(error = ?e, "QR grid found but not decodable");
                None
            }
        })
    }
}

/// Builds the readers for a configuration's format allow-list, in order.
///
/// Formats without a reader are skipped; `ScanConfig::validate` rejects
/// them up front.
pub fn readers_for(config: &ScanConfig) -> Vec<Box<dyn BarcodeReader>> {
    config
        .formats
        .iter()
        .filter_map(|format| -> Option<Box<dyn BarcodeReader>> {
            match format {
                Symbology::Code128 => Some(Box::new(Code128Reader::new(
                    config.scan_rows,
                    config.ink_threshold,
                ))),
                Symbology::Code39 => Some(Box::new(Code39Reader::new(
                    config.scan_rows,
                    config.ink_threshold,
                ))),
                Symbology::Qr => Some(Box::new(QrReader)),
                other => {
                    tracing::warn!(format = %other, "No still-image reader for format");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_follow_allow_list_order() {
        let config = ScanConfig {
            formats: vec![Symbology::Qr, Symbology::Code39],
            ..Default::default()
        };
        let formats: Vec<_> = readers_for(&config).iter().map(|r| r.format()).collect();
        assert_eq!(formats, vec![Symbology::Qr, Symbology::Code39]);
    }

    #[test]
    fn test_unreadable_format_skipped() {
        let config = ScanConfig {
            formats: vec![Symbology::Ean13, Symbology::Code128],
            ..Default::default()
        };
        let formats: Vec<_> = readers_for(&config).iter().map(|r| r.format()).collect();
        assert_eq!(formats, vec![Symbology::Code128]);
    }

    #[test]
    fn test_qr_reader_on_blank_image() {
        let blank = GrayImage::from_pixel(64, 64, image::Luma([255]));
        assert_eq!(QrReader.read(&blank), None);
        assert_eq!(QrReader.read(&GrayImage::new(0, 0)), None);
    }
}
