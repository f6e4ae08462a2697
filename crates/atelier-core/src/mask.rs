//! Freehand mask painting for localized edits.
//!
//! The mask is an RGBA surface the size of the image's native pixel grid.
//! It starts fully transparent and accumulates opaque white strokes. Brush
//! sizes are given in screen pixels and scaled by `native / rendered` at
//! every event, so a stroke looks the same width on screen at any zoom.
//!
//! Strokes are rasterized without anti-aliasing: a pixel is either
//! painted or not, so the exported mask is strictly two-valued.

use image::{Rgba, RgbaImage};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::compositor;
use crate::transform::{ElementRect, brush_scale, screen_to_image};
use crate::types::{Dimensions, Point, RasterImage, StudioError, ValidationError};

/// Paint used for every mask stroke.
fn brush_paint() -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = false;
    paint
}

/// Transparent mask surface plus the in-progress stroke.
#[derive(Debug, Clone)]
pub struct MaskSurface {
    pixmap: Pixmap,
    dimensions: Dimensions,
    has_content: bool,
    last: Option<Point>,
}

impl MaskSurface {
    /// Allocate a transparent surface of `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Compositor`] if the surface cannot be
    /// allocated.
    pub fn new(dimensions: Dimensions) -> Result<Self, StudioError> {
        let pixmap = Pixmap::new(dimensions.width, dimensions.height).ok_or_else(|| {
            StudioError::Compositor(format!("cannot allocate a {dimensions} mask surface"))
        })?;
        Ok(Self {
            pixmap,
            dimensions,
            has_content: false,
            last: None,
        })
    }

    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// `true` once any stroke has been drawn since the last clear.
    #[must_use]
    pub const fn has_content(&self) -> bool {
        self.has_content
    }

    /// `true` while a stroke is in progress.
    #[must_use]
    pub const fn is_stroking(&self) -> bool {
        self.last.is_some()
    }

    /// Start a stroke at a screen position: stamp one brush-sized dot.
    pub fn begin_stroke(&mut self, screen: Point, element: &ElementRect, brush_size: f64) {
        let at = screen_to_image(screen, element, self.dimensions);
        let diameter = brush_size * brush_scale(self.dimensions.width, element.width);
        self.stamp(at, diameter);
        self.last = Some(at);
    }

    /// Extend the current stroke to a screen position. Returns `false`
    /// (and draws nothing) when no stroke is in progress.
    pub fn continue_stroke(&mut self, screen: Point, element: &ElementRect, brush_size: f64) -> bool {
        let Some(from) = self.last else {
            return false;
        };
        let to = screen_to_image(screen, element, self.dimensions);
        let width = brush_size * brush_scale(self.dimensions.width, element.width);
        self.segment(from, to, width);
        self.last = Some(to);
        true
    }

    /// Finish the current stroke. Idempotent.
    pub const fn end_stroke(&mut self) {
        self.last = None;
    }

    /// Fill a disc of `diameter` native pixels centered on `center`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn stamp(&mut self, center: Point, diameter: f64) {
        let radius = (diameter / 2.0) as f32;
        if !(radius.is_finite() && radius > 0.0) {
            return;
        }
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius) else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &brush_paint(),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        self.has_content = true;
    }

    /// Draw a round-capped segment of `width` native pixels.
    #[allow(clippy::cast_possible_truncation)]
    pub fn segment(&mut self, from: Point, to: Point, width: f64) {
        // A zero-length segment is just its round cap.
        if from.distance(to) < f64::EPSILON {
            self.stamp(to, width);
            return;
        }
        let width = width as f32;
        if !(width.is_finite() && width > 0.0) {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(from.x as f32, from.y as f32);
        pb.line_to(to.x as f32, to.y as f32);
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &brush_paint(), &stroke, Transform::identity(), None);
        self.has_content = true;
    }

    /// Erase everything and end any stroke.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
        self.has_content = false;
        self.last = None;
    }

    /// `true` if nothing would be transmitted: no stroke has been drawn,
    /// or every byte of the surface is still zero (e.g. all strokes fell
    /// outside the image).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        !self.has_content || self.pixmap.data().iter().all(|&b| b == 0)
    }

    /// `true` if the native pixel `(x, y)` is painted.
    #[must_use]
    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        self.pixmap.pixel(x, y).is_some_and(|p| p.alpha() > 0)
    }

    /// Number of painted pixels.
    #[must_use]
    pub fn painted_pixels(&self) -> usize {
        self.pixmap.data().chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    /// The surface as straight-alpha RGBA, for overlays.
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        let data = self.pixmap.data();
        let mut img = RgbaImage::new(self.dimensions.width, self.dimensions.height);
        for (px, chunk) in img.pixels_mut().zip(data.chunks_exact(4)) {
            let a = chunk[3];
            *px = if a == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                // Un-premultiply: channel = premultiplied * 255 / alpha.
                let un = |c: u8| u8::try_from(u16::from(c) * 255 / u16::from(a)).unwrap_or(u8::MAX);
                Rgba([un(chunk[0]), un(chunk[1]), un(chunk[2]), a])
            };
        }
        img
    }

    /// Flatten the strokes onto an opaque black background and encode
    /// the result as PNG.
    ///
    /// The returned image has the same dimensions as the surface: white
    /// marks the region to edit, black everything else. The surface
    /// itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyMask`] if the mask is blank, and
    /// [`StudioError::Compositor`] if the flattening surface cannot be
    /// allocated or encoded.
    pub fn extract_final_mask(&self) -> Result<RasterImage, StudioError> {
        if self.is_blank() {
            return Err(ValidationError::EmptyMask.into());
        }
        let mut flat = Pixmap::new(self.dimensions.width, self.dimensions.height).ok_or_else(|| {
            StudioError::Compositor(format!("cannot allocate a {} mask surface", self.dimensions))
        })?;
        flat.fill(Color::BLACK);
        flat.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        // Fully opaque, so premultiplied and straight alpha coincide.
        let rgba = RgbaImage::from_raw(self.dimensions.width, self.dimensions.height, flat.take())
            .ok_or_else(|| StudioError::Compositor("mask buffer has the wrong size".into()))?;
        let bytes = compositor::encode_png(&rgba)?;
        Ok(RasterImage::new(bytes, "image/png").with_dimensions(self.dimensions))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn surface(w: u32, h: u32) -> MaskSurface {
        MaskSurface::new(Dimensions::new(w, h).unwrap()).unwrap()
    }

    #[test]
    fn starts_blank() {
        let mask = surface(64, 32);
        assert!(!mask.has_content());
        assert!(mask.is_blank());
        assert_eq!(mask.painted_pixels(), 0);
        assert!(matches!(
            mask.extract_final_mask(),
            Err(StudioError::Validation(ValidationError::EmptyMask))
        ));
    }

    #[test]
    fn single_point_stamps_a_dot() {
        let mut mask = surface(200, 200);
        let rect = ElementRect::new(0.0, 0.0, 100.0, 100.0);
        mask.begin_stroke(Point::new(50.0, 50.0), &rect, 10.0);
        mask.end_stroke();
        assert!(mask.has_content());
        assert!(!mask.is_blank());
        // Brush 10 on screen is 20 native px: radius 10 around (100, 100).
        assert!(mask.is_painted(100, 100));
        assert!(mask.is_painted(107, 100));
        assert!(!mask.is_painted(112, 100));
        assert!(!mask.is_painted(100, 112));
    }

    #[test]
    fn brush_width_scales_with_display_size() {
        // 2000x1000 native shown at 500x250: brush 40 paints 160 px.
        let mut mask = surface(2000, 1000);
        let rect = ElementRect::new(0.0, 0.0, 500.0, 250.0);
        mask.begin_stroke(Point::new(100.0, 100.0), &rect, 40.0);
        assert!(mask.continue_stroke(Point::new(200.0, 100.0), &rect, 40.0));
        mask.end_stroke();
        // The segment runs from (400, 400) to (800, 400) in native space;
        // its band spans y in [320, 480].
        assert!(mask.is_painted(600, 400));
        assert!(mask.is_painted(600, 322));
        assert!(mask.is_painted(600, 478));
        assert!(!mask.is_painted(600, 317));
        assert!(!mask.is_painted(600, 483));
    }

    #[test]
    fn continue_without_begin_draws_nothing() {
        let mut mask = surface(50, 50);
        let rect = ElementRect::new(0.0, 0.0, 50.0, 50.0);
        assert!(!mask.continue_stroke(Point::new(10.0, 10.0), &rect, 5.0));
        assert!(mask.is_blank());
    }

    #[test]
    fn end_stroke_breaks_the_line() {
        let mut mask = surface(100, 100);
        let rect = ElementRect::new(0.0, 0.0, 100.0, 100.0);
        mask.begin_stroke(Point::new(10.0, 10.0), &rect, 4.0);
        mask.end_stroke();
        assert!(!mask.continue_stroke(Point::new(90.0, 10.0), &rect, 4.0));
        assert!(!mask.is_painted(50, 10));
    }

    #[test]
    fn strokes_are_binary() {
        let mut mask = surface(120, 120);
        let rect = ElementRect::new(0.0, 0.0, 120.0, 120.0);
        mask.begin_stroke(Point::new(10.0, 13.3), &rect, 7.7);
        mask.continue_stroke(Point::new(97.1, 88.8), &rect, 7.7);
        mask.end_stroke();
        assert!(
            mask.to_rgba()
                .pixels()
                .all(|p| p.0 == [0, 0, 0, 0] || p.0 == [255, 255, 255, 255])
        );
    }

    #[test]
    fn clear_resets_content() {
        let mut mask = surface(40, 40);
        mask.stamp(Point::new(20.0, 20.0), 10.0);
        assert!(mask.has_content());
        mask.clear();
        assert!(!mask.has_content());
        assert!(mask.is_blank());
        assert_eq!(mask.painted_pixels(), 0);
    }

    #[test]
    fn strokes_outside_the_image_leave_it_blank() {
        let mut mask = surface(40, 40);
        mask.stamp(Point::new(-500.0, -500.0), 10.0);
        assert!(mask.has_content());
        assert!(mask.is_blank());
    }

    #[test]
    fn final_mask_is_black_and_white_png() {
        let mut mask = surface(30, 20);
        mask.stamp(Point::new(15.0, 10.0), 6.0);
        let out = mask.extract_final_mask().unwrap();
        assert_eq!(out.mime(), "image/png");
        assert_eq!(out.dimensions(), Some(Dimensions::new(30, 20).unwrap()));
        let pixels = compositor::read_rgba(out.bytes()).unwrap();
        assert_eq!(pixels.dimensions(), (30, 20));
        assert_eq!(pixels.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(15, 10).0, [255, 255, 255, 255]);
        assert!(
            pixels
                .pixels()
                .all(|p| p.0 == [0, 0, 0, 255] || p.0 == [255, 255, 255, 255])
        );
        // Extraction does not consume the strokes.
        assert!(mask.has_content());
    }
}
