//! Camera facing and torch toggles.
//!
//! These hold no state of their own: the frame source is the single
//! owner of what camera is selected and whether the torch is lit.

use super::{CameraError, FrameSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical camera feeds the frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear (world-facing) camera.
    #[default]
    Rear,
    /// Front (user-facing) camera.
    Front,
}

impl Facing {
    /// The other camera.
    pub fn flipped(self) -> Self {
        match self {
            Facing::Rear => Facing::Front,
            Facing::Front => Facing::Rear,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Rear => f.write_str("rear"),
            Facing::Front => f.write_str("front"),
        }
    }
}

/// Switches between front and rear camera. Returns the new facing.
pub fn toggle_facing<S: FrameSource + ?Sized>(source: &mut S) -> Result<Facing, CameraError> {
    let next = source.facing().flipped();
    source.set_facing(next)?;
    tracing::debug!(facing = %next, "Camera facing switched");
    Ok(next)
}

/// Flips the torch. Returns whether it is now lit.
pub fn toggle_torch<S: FrameSource + ?Sized>(source: &mut S) -> Result<bool, CameraError> {
    let next = !source.torch();
    source.set_torch(next)?;
    tracing::debug!(torch = next, "Torch toggled");
    Ok(next)
}
