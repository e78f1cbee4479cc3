/// Watermark stamping
///
/// Draws an agency logo over a finished photo. The operation is
/// deliberately non-throwing: a photo without its watermark is worth more
/// than no photo, so every failure path logs and hands back the base image
/// unchanged.

use serde::{Deserialize, Serialize};

use crate::compositor::{self, Layer, QUALITY_FINAL};
use crate::geometry::{self, Anchor};

/// Watermark rendering options.
///
/// `margin` of None means the default policy of 3% of the base width.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkOptions {
    pub opacity: f32,
    pub position: Anchor,
    pub scale: f32,
    pub margin: Option<f32>,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        WatermarkOptions {
            opacity: 0.8,
            position: Anchor::BottomRight,
            scale: 0.2,
            margin: None,
        }
    }
}

/// Stamp `watermark` onto `base` and re-encode.
///
/// Both arguments are image sources (data URI or path). Never fails: when
/// the watermark cannot be loaded or drawn, the base string is returned
/// untouched.
pub fn apply_watermark(base: &str, watermark: &str, options: &WatermarkOptions) -> String {
    match try_apply(base, watermark, options) {
        Ok(stamped) => stamped,
        Err(e) => {
            log::warn!("watermark skipped: {}", e);
            base.to_string()
        }
    }
}

fn try_apply(base: &str, watermark: &str, options: &WatermarkOptions) -> crate::error::Result<String> {
    let base_raster = compositor::load_image(base)?;
    let mark = compositor::load_image(watermark)?;

    let bw = base_raster.width() as f32;
    let bh = base_raster.height() as f32;
    let aspect = mark.width() as f32 / mark.height().max(1) as f32;

    let margin = options.margin.unwrap_or_else(|| geometry::default_margin(bw));
    let placement = geometry::place_overlay(bw, bh, aspect, options.scale, margin, options.position);

    let stamped = compositor::composite_layers(
        &base_raster,
        &[Layer {
            raster: &mark,
            x: placement.x,
            y: placement.y,
            width: placement.width,
            height: placement.height,
            alpha: options.opacity,
        }],
    );

    compositor::encode_jpeg(&stamped, QUALITY_FINAL)
}
