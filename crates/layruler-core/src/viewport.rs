//! Zoom state used to turn pixel tolerances into microns.

use serde::{Deserialize, Serialize};

/// Zoom of the layout view the pointer events come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Pixels per micron.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl Viewport {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Convert a pixel distance to microns. A degenerate zoom yields zero.
    pub fn pixels_to_world(&self, pixels: f64) -> f64 {
        if self.scale.is_normal() && self.scale > 0.0 {
            pixels / self.scale
        } else {
            0.0
        }
    }
}
