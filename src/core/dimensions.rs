//! Estimated room dimensions.

use serde::{Deserialize, Serialize};

/// Estimated width/length/height of the scanned room.
///
/// All dimensions are in meters and strictly positive once validated;
/// confidence is in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomDimensions {
    /// Extent along the shorter horizontal axis in meters
    pub width: f32,
    /// Extent along the longer horizontal axis in meters
    pub length: f32,
    /// Floor-to-ceiling height in meters
    pub height: f32,
    /// Estimate confidence in (0, 1]
    pub confidence: f32,
}

impl RoomDimensions {
    /// Create new dimensions.
    pub fn new(width: f32, length: f32, height: f32, confidence: f32) -> Self {
        Self {
            width,
            length,
            height,
            confidence,
        }
    }

    /// Floor area in square meters.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.length
    }

    /// Room volume in cubic meters.
    #[inline]
    pub fn volume(&self) -> f32 {
        self.width * self.length * self.height
    }
}
