//! Surfaces the capture screen needs from the surrounding application.

use crate::decode::DecodeReport;
use std::fmt;
use thiserror::Error;

/// Failure reported by the navigation layer.
#[derive(Debug, Clone, Error)]
#[error("navigation failed: {0}")]
pub struct NavigationError(pub String);

/// User-visible notices raised by the capture screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Camera access was refused; the session has ended.
    PermissionDenied,
    /// The picked image contained no readable symbol.
    NoCodeFound { width: u32, height: u32 },
    /// The picked file could not be read as an image.
    ImageLoadFailed(String),
    /// Handling a detected value failed; detection was re-armed.
    ScanFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PermissionDenied => f.write_str("Camera permission denied"),
            Notice::NoCodeFound { width, height } => {
                write!(f, "No barcode found in the picked image ({width}x{height})")
            }
            Notice::ImageLoadFailed(reason) => write!(f, "Could not open the picked image: {reason}"),
            Notice::ScanFailed(reason) => write!(f, "Scan could not be completed: {reason}"),
        }
    }
}

/// Navigation and notification hooks of the host application.
///
/// Called only from the UI context that owns the capture screen.
pub trait ScreenHost: Send + 'static {
    /// Pops the capture screen off the navigation stack.
    fn close_capture_screen(&mut self) -> Result<(), NavigationError>;

    /// Shows a notice to the user.
    fn notify(&mut self, notice: Notice);

    /// Called after every still-image decode, hit or miss.
    fn decode_finished(&mut self, _report: &DecodeReport) {}
}
