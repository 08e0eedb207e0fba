//! Still-image decoding.
//!
//! A picked image is decoded in two ordered steps:
//!
//! ```text
//! bitmap ──► direct decode ──► hit? ──► value
//!                 │ miss
//!                 ▼
//!          NTSC grayscale ──► decode once more ──► value | no result
//! ```
//!
//! Every reader on the allow-list is tried at each step. A miss is a
//! normal outcome and never surfaces as an error; only loading the
//! picked bytes can fail.

mod bitmap;
mod code128;
mod code39;
mod engine;
mod grayscale;
mod reader;
mod scanline;

#[cfg(test)]
pub(crate) mod fixtures;

pub use bitmap::{Bitmap, ImageLoadError};
pub use code128::Code128Reader;
pub use code39::Code39Reader;
pub use engine::{Attempt, DecodeEngine, DecodeReport, DecodedValue, Strategy};
pub use grayscale::{luminance, to_grayscale};
pub use reader::{readers_for, BarcodeReader, QrReader};
