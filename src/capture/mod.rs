//! Live detection input and camera session controls.
//!
//! This module provides the frame source abstraction the capture session
//! listens to, the detection batches it emits, and the configuration
//! shared by live and still-image scanning. The camera is treated as an
//! external collaborator: only detection results cross this boundary.

mod config;
mod controls;
mod event;
mod source;

pub use config::{ConfigError, FileConfig, OutputConfig, ScanConfig, DECODABLE_FORMATS};
pub use controls::{toggle_facing, toggle_torch, Facing};
pub use event::{Detection, DetectionEvent, Symbology};
pub use source::{CameraError, FrameSource, MockFrameSource};
