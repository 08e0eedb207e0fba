//! Fully materialized still images handed over by the file picker.

use super::grayscale::to_grayscale;
use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use std::fmt;
use thiserror::Error;

/// Errors raised while turning picked bytes into a bitmap.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("picked file {0:?} is empty")]
    Empty(String),
    #[error("picked file {name:?} is not a supported image: {source}")]
    Unsupported {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("picked file {name:?} has no pixels ({width}x{height})")]
    NoPixels { name: String, width: u32, height: u32 },
}

/// A decoded still image.
#[derive(Clone)]
pub struct Bitmap {
    image: DynamicImage,
    name: Option<String>,
}

impl Bitmap {
    /// Decodes picked file bytes. The content is sniffed first; the
    /// declared file name's extension is the fallback hint.
    pub fn load(bytes: &[u8], file_name: &str) -> Result<Self, ImageLoadError> {
        if bytes.is_empty() {
            return Err(ImageLoadError::Empty(file_name.to_string()));
        }
        let image = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(sniff_error) => match ImageFormat::from_path(file_name) {
                Ok(format) => image::load_from_memory_with_format(bytes, format),
                Err(_) => Err(sniff_error),
            }
            .map_err(|source| ImageLoadError::Unsupported {
                name: file_name.to_string(),
                source,
            })?,
        };
        if image.width() == 0 || image.height() == 0 {
            return Err(ImageLoadError::NoPixels {
                name: file_name.to_string(),
                width: image.width(),
                height: image.height(),
            });
        }
        tracing::debug!(
            file = file_name,
            width = image.width(),
            height = image.height(),
            "Picked image loaded"
        );
        Ok(Self {
            image,
            name: Some(file_name.to_string()),
        })
    }

    /// Wraps an in-memory RGBA image.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
            name: None,
        }
    }

    /// Declared file name, if the bitmap came from the picker.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Luminance view exactly as the `image` crate derives it from the
    /// stored pixels, with no preprocessing.
    pub fn luma(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// NTSC-weighted grayscale copy; alpha is kept.
    pub fn to_grayscale(&self) -> Bitmap {
        Bitmap {
            image: DynamicImage::ImageRgba8(to_grayscale(&self.image.to_rgba8())),
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("name", &self.name)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
