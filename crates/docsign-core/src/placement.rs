//! Signature image placement relative to the matched name
//!
//! All coordinates are PDF user space: bottom-left origin, Y up.

use serde::{Deserialize, Serialize};
use shared_types::{PlacementRect, SignatureKind, SignaturePosition};

/// Nominal size of a stamped signature image, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampSize {
    pub width: f64,
    pub height: f64,
}

impl StampSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Stamp sizes per signature kind and the gap kept from the name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub primary: StampSize,
    pub counter: StampSize,
    pub padding: f64,
}

impl PlacementConfig {
    pub const DEFAULT_PRIMARY: StampSize = StampSize::new(120.0, 50.0);
    pub const DEFAULT_COUNTER: StampSize = StampSize::new(60.0, 25.0);
    pub const DEFAULT_PADDING: f64 = 10.0;

    pub fn stamp_size(&self, kind: SignatureKind) -> StampSize {
        match kind {
            SignatureKind::Primary => self.primary,
            SignatureKind::Counter => self.counter,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            primary: Self::DEFAULT_PRIMARY,
            counter: Self::DEFAULT_COUNTER,
            padding: Self::DEFAULT_PADDING,
        }
    }
}

/// Compute where the signature image goes.
///
/// A primary stamp sits above the name, centered horizontally on it. A
/// counter stamp sits to the right of the name, centered vertically on it.
pub fn compute_placement(
    position: &SignaturePosition,
    kind: SignatureKind,
    config: &PlacementConfig,
) -> PlacementRect {
    let stamp = config.stamp_size(kind);

    let (x, y) = match kind {
        SignatureKind::Primary => (
            position.x - (stamp.width - position.matched_width) / 2.0,
            position.y + position.matched_height + config.padding,
        ),
        SignatureKind::Counter => (
            position.x + position.matched_width + config.padding,
            position.y - (stamp.height - position.matched_height) / 2.0,
        ),
    };

    PlacementRect {
        x,
        y,
        width: stamp.width,
        height: stamp.height,
        page: position.page,
    }
}
