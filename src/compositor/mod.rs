/// Canvas compositor
///
/// Deterministic, synchronous raster compositing: load an image source into
/// a decoded raster, draw layers over a base with per-layer alpha, apply the
/// brightness filter used by the exposure ladder, and serialize back to a
/// JPEG data URI. Each call starts from a fresh raster — nothing persists
/// between operations.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::{Error, Result};

pub mod encoding;

/// JPEG quality for capture frames and watermark output
pub const QUALITY_FINAL: u8 = 95;
/// JPEG quality for images downscaled before an AI call
pub const QUALITY_AI_INPUT: u8 = 92;
/// JPEG quality for image+mask composites sent to the edit service
pub const QUALITY_MASK_COMPOSITE: u8 = 88;
/// Maximum width handed to the AI collaborators
pub const AI_MAX_WIDTH: u32 = 1920;

/// One overlay draw: a raster placed at `(x, y)` scaled to
/// `width` x `height`, blended with a global alpha multiplier.
///
/// Alpha applies to this layer only and never accumulates into the next —
/// the globalAlpha-reset semantics of the original pipeline.
pub struct Layer<'a> {
    pub raster: &'a RgbaImage,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
}

/// Resolve an image source to a decoded raster.
///
/// Accepts a data URI (decoded in place) or a filesystem path. Fails with
/// `Error::ImageLoad` when the source cannot be fetched or decoded.
pub fn load_image(source: &str) -> Result<RgbaImage> {
    let bytes = if encoding::is_data_uri(source) {
        encoding::decode(source)?
    } else {
        std::fs::read(source)
            .map_err(|e| Error::ImageLoad(format!("cannot read {}: {}", source, e)))?
    };

    let img = image::load_from_memory(&bytes)?;
    Ok(img.to_rgba8())
}

/// Draw `base` at native resolution, then each layer in array order.
pub fn composite_layers(base: &RgbaImage, layers: &[Layer<'_>]) -> RgbaImage {
    let mut canvas = base.clone();

    for layer in layers {
        draw_layer(&mut canvas, layer);
    }

    canvas
}

/// Blend one layer onto the canvas (source-over, straight alpha).
fn draw_layer(canvas: &mut RgbaImage, layer: &Layer<'_>) {
    let target_w = layer.width.round().max(1.0) as u32;
    let target_h = layer.height.round().max(1.0) as u32;

    let resized;
    let src: &RgbaImage =
        if layer.raster.width() == target_w && layer.raster.height() == target_h {
            layer.raster
        } else {
            resized = image::imageops::resize(layer.raster, target_w, target_h, FilterType::Triangle);
            &resized
        };

    let global_alpha = layer.alpha.clamp(0.0, 1.0);
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let (ox, oy) = (layer.x.round() as i64, layer.y.round() as i64);

    for (sx, sy, px) in src.enumerate_pixels() {
        let tx = ox + sx as i64;
        let ty = oy + sy as i64;
        if tx < 0 || ty < 0 || tx >= cw || ty >= ch {
            continue;
        }

        let alpha = (px[3] as f32 / 255.0) * global_alpha;
        if alpha <= 0.0 {
            continue;
        }

        let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
        for c in 0..3 {
            let blended = px[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
            dst[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        let out_a = alpha + (dst[3] as f32 / 255.0) * (1.0 - alpha);
        dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Per-pixel brightness multiplier, the CSS `brightness()` analogue used to
/// simulate the exposure ladder. Alpha is untouched.
pub fn brightness(raster: &RgbaImage, factor: f32) -> RgbaImage {
    let mut out = raster.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px[c] = (px[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Serialize a raster to a JPEG data URI at the given quality (0-100).
pub fn encode_jpeg(raster: &RgbaImage, quality: u8) -> Result<String> {
    let rgb = DynamicImage::ImageRgba8(raster.clone()).to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| Error::Encode(e.to_string()))?;

    Ok(encoding::to_data_uri(&bytes, encoding::DEFAULT_MIME))
}

/// Downscale an encoded image before handing it to an AI collaborator.
///
/// Images at or under `max_width` pass through unchanged, as does anything
/// that fails to decode — the collaborators tolerate the original size, so
/// this stage is best-effort by design.
pub fn resize_for_ai(encoded: &str, max_width: u32) -> String {
    let raster = match load_image(encoded) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("resize_for_ai: decode failed, passing through: {}", e);
            return encoded.to_string();
        }
    };

    if raster.width() <= max_width {
        return encoded.to_string();
    }

    let scale = max_width as f32 / raster.width() as f32;
    let height = (raster.height() as f32 * scale).round().max(1.0) as u32;
    let resized = image::imageops::resize(&raster, max_width, height, FilterType::Lanczos3);

    match encode_jpeg(&resized, QUALITY_AI_INPUT) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("resize_for_ai: re-encode failed, passing through: {}", e);
            encoded.to_string()
        }
    }
}

/// Solid-color raster, handy for masks and tests.
pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}
