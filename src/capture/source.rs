//! Frame source abstraction for live detection.
//!
//! The camera pipeline itself lives outside this crate. A frame source
//! analyses frames on its own thread and hands back detection batches;
//! this trait is the narrow surface the capture session talks to.

use super::{Detection, DetectionEvent, Facing, ScanConfig};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors that can occur during frame source operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to analyse frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for frame source implementations.
///
/// This abstraction allows swapping between a real camera pipeline
/// and scripted sources for testing.
pub trait FrameSource {
    /// Opens the source with the given configuration.
    fn open(&mut self, config: &ScanConfig) -> Result<(), CameraError>;

    /// Analyses the next frame and returns its detection batch.
    fn next_event(&mut self) -> Result<DetectionEvent, CameraError>;

    /// Selects the front or rear camera.
    fn set_facing(&mut self, facing: Facing) -> Result<(), CameraError>;

    /// Currently selected camera.
    fn facing(&self) -> Facing;

    /// Switches the torch on or off.
    fn set_torch(&mut self, on: bool) -> Result<(), CameraError>;

    /// Whether the torch is lit.
    fn torch(&self) -> bool;

    /// Checks if the source is currently open.
    fn is_open(&self) -> bool;

    /// Closes the source and releases resources.
    fn close(&mut self);
}

/// Scripted frame source that replays prepared detection batches.
///
/// Once the script runs out every frame reports an empty batch, which is
/// what a real camera pointed at nothing does.
#[derive(Debug, Default)]
pub struct MockFrameSource {
    script: VecDeque<Vec<Detection>>,
    open: bool,
    deny_permission: bool,
    facing: Facing,
    torch: bool,
    sequence: u64,
}

impl MockFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that replays `batches` in order.
    pub fn with_script(batches: impl IntoIterator<Item = Vec<Detection>>) -> Self {
        Self {
            script: batches.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Makes `open` fail as if the user refused camera access.
    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Appends a batch to the script.
    pub fn push(&mut self, batch: Vec<Detection>) {
        self.script.push_back(batch);
    }
}

impl FrameSource for MockFrameSource {
    fn open(&mut self, config: &ScanConfig) -> Result<(), CameraError> {
        if self.deny_permission {
            return Err(CameraError::PermissionDenied);
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.open = true;
        self.facing = config.facing;
        self.torch = config.torch;
        self.sequence = 0;
        tracing::info!(facing = %self.facing, torch = self.torch, "MockFrameSource opened");
        Ok(())
    }

    fn next_event(&mut self) -> Result<DetectionEvent, CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        let batch = self.script.pop_front().unwrap_or_default();
        self.sequence += 1;
        Ok(DetectionEvent::new(batch, self.sequence))
    }

    fn set_facing(&mut self, facing: Facing) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        self.facing = facing;
        Ok(())
    }

    fn facing(&self) -> Facing {
        self.facing
    }

    fn set_torch(&mut self, on: bool) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        self.torch = on;
        Ok(())
    }

    fn torch(&self) -> bool {
        self.torch
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        tracing::info!("MockFrameSource closed");
    }
}
