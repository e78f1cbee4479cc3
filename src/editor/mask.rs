/// Freehand mask painting
///
/// The user paints over the displayed image to mark a region for removal.
/// Strokes are recorded in display-canvas coordinates and rendered as
/// round-capped lines in a fixed translucent marker color; at apply time
/// the whole layer is re-rendered at the image's native resolution.

use image::{Rgba, RgbaImage};

/// Marker color, rgba(255, 0, 0, 0.6)
pub const BRUSH_COLOR: Rgba<u8> = Rgba([255, 0, 0, 153]);

/// Default brush diameter in display pixels
pub const DEFAULT_BRUSH_SIZE: f32 = 26.0;
/// Brush diameter bounds exposed by the UI slider
pub const MIN_BRUSH_SIZE: f32 = 10.0;
pub const MAX_BRUSH_SIZE: f32 = 80.0;

struct Stroke {
    points: Vec<(f32, f32)>,
    diameter: f32,
}

/// Accumulated mask strokes over a display canvas of known size.
///
/// Not part of the edit history — cleared after each applied edit or undo.
pub struct MaskLayer {
    width: u32,
    height: u32,
    brush_size: f32,
    strokes: Vec<Stroke>,
    drawing: bool,
}

impl MaskLayer {
    /// New empty mask over a display canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        MaskLayer {
            width,
            height,
            brush_size: DEFAULT_BRUSH_SIZE,
            strokes: Vec::new(),
            drawing: false,
        }
    }

    pub fn brush_size(&self) -> f32 {
        self.brush_size
    }

    /// Set the brush diameter, clamped to the slider's range.
    pub fn set_brush_size(&mut self, size: f32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Keep the layer in sync with a resized display canvas. Existing
    /// strokes are discarded — their coordinates no longer apply.
    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.strokes.clear();
            self.drawing = false;
        }
    }

    /// Pointer-down: start a stroke with a filled dot under the cursor.
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        self.drawing = true;
        self.strokes.push(Stroke {
            points: vec![(x, y)],
            diameter: self.brush_size,
        });
    }

    /// Pointer-move: continue the active stroke. Ignored when no stroke is
    /// active.
    pub fn extend_stroke(&mut self, x: f32, y: f32) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push((x, y));
        }
    }

    /// Pointer-up: end the active stroke. Strokes accumulate until cleared.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Drop all strokes.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Render at display resolution.
    pub fn render(&self) -> RgbaImage {
        self.render_scaled(self.width, self.height)
    }

    /// Render at an arbitrary target resolution, scaling stroke positions
    /// and brush widths from display to target space. Used at apply time to
    /// paint the mask at the image's native size.
    pub fn render_scaled(&self, target_width: u32, target_height: u32) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(target_width, target_height, Rgba([0, 0, 0, 0]));
        if self.width == 0 || self.height == 0 {
            return out;
        }

        let sx = target_width as f32 / self.width as f32;
        let sy = target_height as f32 / self.height as f32;
        // Brush stays circular; scale it by the dominant axis
        let brush_scale = sx.max(sy);

        for stroke in &self.strokes {
            let radius = stroke.diameter * brush_scale / 2.0;

            let mut prev: Option<(f32, f32)> = None;
            for &(px, py) in &stroke.points {
                let point = (px * sx, py * sy);
                match prev {
                    None => stamp_circle(&mut out, point.0, point.1, radius),
                    Some(last) => stamp_segment(&mut out, last, point, radius),
                }
                prev = Some(point);
            }
        }

        out
    }
}

/// Fill a disc of the marker color.
fn stamp_circle(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32) {
    let r = radius.max(0.5);
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);

    let x0 = ((cx - r).floor() as i64).max(0);
    let x1 = ((cx + r).ceil() as i64).min(w - 1);
    let y0 = ((cy - r).floor() as i64).max(0);
    let y1 = ((cy + r).ceil() as i64).min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r * r {
                canvas.put_pixel(x as u32, y as u32, BRUSH_COLOR);
            }
        }
    }
}

/// Round-capped line: discs stamped along the segment at sub-radius steps.
fn stamp_segment(canvas: &mut RgbaImage, from: (f32, f32), to: (f32, f32), radius: f32) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let length = (dx * dx + dy * dy).sqrt();

    let step = (radius / 2.0).max(0.5);
    let count = (length / step).ceil().max(1.0) as u32;

    for i in 0..=count {
        let t = i as f32 / count as f32;
        stamp_circle(canvas, from.0 + dx * t, from.1 + dy * t, radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mask_renders_transparent() {
        let mask = MaskLayer::new(100, 80);
        assert!(mask.is_empty());

        let raster = mask.render();
        assert!(raster.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_stroke_paints_marker_color() {
        let mut mask = MaskLayer::new(100, 100);
        mask.begin_stroke(50.0, 50.0);
        mask.end_stroke();

        let raster = mask.render();
        assert_eq!(*raster.get_pixel(50, 50), BRUSH_COLOR);
        // Well outside the brush radius: untouched
        assert_eq!(raster.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn test_segment_connects_points() {
        let mut mask = MaskLayer::new(100, 100);
        mask.begin_stroke(10.0, 50.0);
        mask.extend_stroke(90.0, 50.0);
        mask.end_stroke();

        let raster = mask.render();
        // Midpoint of the segment is covered
        assert_eq!(*raster.get_pixel(50, 50), BRUSH_COLOR);
    }

    #[test]
    fn test_strokes_accumulate_until_cleared() {
        let mut mask = MaskLayer::new(100, 100);
        mask.begin_stroke(20.0, 20.0);
        mask.end_stroke();
        mask.begin_stroke(80.0, 80.0);
        mask.end_stroke();

        let raster = mask.render();
        assert_eq!(*raster.get_pixel(20, 20), BRUSH_COLOR);
        assert_eq!(*raster.get_pixel(80, 80), BRUSH_COLOR);

        mask.clear();
        assert!(mask.is_empty());
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut mask = MaskLayer::new(100, 100);
        mask.extend_stroke(50.0, 50.0);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_scaled_render_maps_display_to_native() {
        let mut mask = MaskLayer::new(100, 100);
        mask.begin_stroke(25.0, 75.0);
        mask.end_stroke();

        // Native image is 4x the display canvas
        let raster = mask.render_scaled(400, 400);
        assert_eq!(*raster.get_pixel(100, 300), BRUSH_COLOR);
        assert_eq!(raster.get_pixel(300, 100)[3], 0);
    }

    #[test]
    fn test_brush_size_clamped() {
        let mut mask = MaskLayer::new(100, 100);
        mask.set_brush_size(500.0);
        assert_eq!(mask.brush_size(), MAX_BRUSH_SIZE);
        mask.set_brush_size(1.0);
        assert_eq!(mask.brush_size(), MIN_BRUSH_SIZE);
    }

    #[test]
    fn test_resize_discards_stale_strokes() {
        let mut mask = MaskLayer::new(100, 100);
        mask.begin_stroke(50.0, 50.0);
        mask.end_stroke();

        mask.resize_canvas(200, 150);
        assert!(mask.is_empty());
    }
}
