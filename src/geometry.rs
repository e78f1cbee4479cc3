/// Overlay placement geometry
///
/// Pure functions computing where an overlay (watermark or mask) sits on a
/// base raster, given a scale, a margin and a named anchor. Width scales
/// with the base, height follows the overlay's aspect ratio.

use serde::{Deserialize, Serialize};

/// Fraction of the base width used as the default margin
pub const DEFAULT_MARGIN_RATIO: f32 = 0.03;

/// Smallest scale accepted before clamping kicks in
const MIN_SCALE: f32 = 0.01;

/// Named anchor for overlay placement
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Computed overlay rectangle in base-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Default margin policy: 3% of the base width, rounded.
pub fn default_margin(base_width: f32) -> f32 {
    (base_width * DEFAULT_MARGIN_RATIO).round()
}

/// Compute the overlay rectangle for the given anchor.
///
/// `overlay_aspect` is the overlay's native width/height ratio; the result
/// preserves it. `scale` is clamped into (0, 1] and `margin` to >= 0 rather
/// than rejected — malformed values are a caller contract violation and a
/// layout helper has no useful error to report.
pub fn place_overlay(
    base_width: f32,
    base_height: f32,
    overlay_aspect: f32,
    scale: f32,
    margin: f32,
    anchor: Anchor,
) -> Placement {
    let scale = scale.clamp(MIN_SCALE, 1.0);
    let margin = margin.max(0.0);

    let width = base_width * scale;
    let height = width / overlay_aspect;

    let (x, y) = match anchor {
        Anchor::TopLeft => (margin, margin),
        Anchor::TopRight => (base_width - width - margin, margin),
        Anchor::BottomLeft => (margin, base_height - height - margin),
        Anchor::BottomRight => (base_width - width - margin, base_height - height - margin),
        Anchor::Center => ((base_width - width) / 2.0, (base_height - height) / 2.0),
    };

    Placement {
        x,
        y,
        width,
        height,
    }
}
