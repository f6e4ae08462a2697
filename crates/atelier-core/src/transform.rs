//! Screen <-> image coordinate mapping.
//!
//! The displayed image element is positioned and scaled by the viewport
//! (fit-to-container, then zoom and pan). Pointer input arrives in screen
//! space and must be mapped into the image's native pixel grid before it
//! touches the mask. The mapping is derived from the element's *current*
//! rendered rectangle on every event; nothing here is cached, so zoom
//! and pan changes between events are always honored.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Point};
use crate::viewport::ViewportState;

/// Axis-aligned rectangle in screen space, as reported by
/// `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            self.width.mul_add(0.5, self.left),
            self.height.mul_add(0.5, self.top),
        )
    }

    /// Top-left corner.
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// `true` if the rectangle has a positive, finite area.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Per-axis ratio between the native pixel grid and the rendered size.
fn scale_factors(rect: &ElementRect, native: Dimensions) -> (f64, f64) {
    if !rect.is_renderable() {
        return (1.0, 1.0);
    }
    (
        f64::from(native.width) / rect.width,
        f64::from(native.height) / rect.height,
    )
}

/// Map a screen point into native image coordinates.
///
/// `image = (screen - rect.origin) * native / rendered`, per axis.
/// Points outside the element map outside `[0, native)`; callers that
/// draw rely on the surface to clip.
#[must_use]
pub fn screen_to_image(point: Point, rect: &ElementRect, native: Dimensions) -> Point {
    let (sx, sy) = scale_factors(rect, native);
    Point::new((point.x - rect.left) * sx, (point.y - rect.top) * sy)
}

/// Inverse of [`screen_to_image`].
#[must_use]
pub fn image_to_screen(point: Point, rect: &ElementRect, native: Dimensions) -> Point {
    let (sx, sy) = scale_factors(rect, native);
    Point::new(point.x / sx + rect.left, point.y / sy + rect.top)
}

/// Ratio that converts a screen-space length into native pixels.
///
/// Used to keep the brush the same visual size regardless of zoom.
/// Returns `1.0` while the element has no rendered width yet.
#[must_use]
pub fn brush_scale(native_width: u32, rendered_width: f64) -> f64 {
    if rendered_width.is_finite() && rendered_width > 0.0 {
        f64::from(native_width) / rendered_width
    } else {
        1.0
    }
}

/// Computes where the image element is rendered for a given viewport
/// state.
///
/// The image is first fitted into the viewport (object-contain, never
/// upscaled), then scaled by `zoom` about its own center, and that center
/// is offset from the viewport center by `pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    viewport: ElementRect,
    native: Dimensions,
}

impl DisplayTransform {
    #[must_use]
    pub const fn new(viewport: ElementRect, native: Dimensions) -> Self {
        Self { viewport, native }
    }

    /// Size of the image at zoom 1.
    #[must_use]
    pub fn fitted_size(&self) -> (f64, f64) {
        let w = f64::from(self.native.width);
        let h = f64::from(self.native.height);
        if !self.viewport.is_renderable() {
            return (w, h);
        }
        let fit = (self.viewport.width / w).min(self.viewport.height / h).min(1.0);
        (w * fit, h * fit)
    }

    /// Rendered element rectangle for `state`.
    #[must_use]
    pub fn element_rect(&self, state: &ViewportState) -> ElementRect {
        let (fw, fh) = self.fitted_size();
        let w = fw * state.zoom();
        let h = fh * state.zoom();
        let center = self.viewport.center() + state.pan();
        ElementRect::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    /// Map a screen point into native image coordinates under `state`.
    #[must_use]
    pub fn to_image(&self, point: Point, state: &ViewportState) -> Point {
        screen_to_image(point, &self.element_rect(state), self.native)
    }

    /// Map a native image point to screen coordinates under `state`.
    #[must_use]
    pub fn to_screen(&self, point: Point, state: &ViewportState) -> Point {
        image_to_screen(point, &self.element_rect(state), self.native)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn maps_rect_corners() {
        let rect = ElementRect::new(100.0, 50.0, 500.0, 250.0);
        let native = dims(2000, 1000);
        assert!(close(
            screen_to_image(Point::new(100.0, 50.0), &rect, native),
            Point::ZERO
        ));
        assert!(close(
            screen_to_image(Point::new(600.0, 300.0), &rect, native),
            Point::new(2000.0, 1000.0)
        ));
        assert!(close(
            screen_to_image(Point::new(350.0, 175.0), &rect, native),
            Point::new(1000.0, 500.0)
        ));
    }

    #[test]
    fn round_trip_is_identity() {
        let native = dims(1234, 567);
        for rect in [
            ElementRect::new(0.0, 0.0, 617.0, 283.5),
            ElementRect::new(-40.5, 12.25, 3702.0, 1701.0),
            ElementRect::new(300.0, 200.0, 99.0, 45.0),
        ] {
            for p in [
                Point::new(0.0, 0.0),
                Point::new(17.5, 900.0),
                Point::new(-30.0, 5.0),
            ] {
                let back = image_to_screen(screen_to_image(p, &rect, native), &rect, native);
                assert!((back.x - p.x).abs() < 1e-6, "{p:?} -> {back:?}");
                assert!((back.y - p.y).abs() < 1e-6, "{p:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn display_round_trip_under_zoom_and_pan() {
        let viewport = ElementRect::new(20.0, 40.0, 640.0, 360.0);
        let display = DisplayTransform::new(viewport, dims(1920, 1080));
        for zoom in [0.5, 0.75, 1.0, 1.6, 2.5, 3.8, 5.0] {
            for pan in [
                Point::ZERO,
                Point::new(35.0, -12.5),
                Point::new(-210.0, 90.0),
            ] {
                let state = ViewportState::new(zoom, pan);
                for p in [
                    Point::new(20.0, 40.0),
                    Point::new(333.3, 211.7),
                    Point::new(-15.0, 500.0),
                ] {
                    let image = display.to_image(p, &state);
                    let back = display.to_screen(image, &state);
                    assert!(
                        (back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6,
                        "zoom {zoom} pan {pan:?}: {p:?} -> {back:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_is_permitted() {
        let rect = ElementRect::new(0.0, 0.0, 100.0, 100.0);
        let p = screen_to_image(Point::new(-10.0, 150.0), &rect, dims(200, 200));
        assert!(close(p, Point::new(-20.0, 300.0)));
    }

    #[test]
    fn brush_scale_matches_ratio() {
        assert!((brush_scale(2000, 500.0) - 4.0).abs() < f64::EPSILON);
        assert!((brush_scale(2000, 0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fitted_size_never_upscales() {
        let viewport = ElementRect::new(0.0, 0.0, 800.0, 600.0);
        let small = DisplayTransform::new(viewport, dims(100, 50));
        assert_eq!(small.fitted_size(), (100.0, 50.0));

        let wide = DisplayTransform::new(viewport, dims(1600, 400));
        assert_eq!(wide.fitted_size(), (800.0, 200.0));
    }

    #[test]
    fn element_rect_follows_zoom_and_pan() {
        let viewport = ElementRect::new(0.0, 0.0, 800.0, 600.0);
        let display = DisplayTransform::new(viewport, dims(1600, 1200));
        let state = ViewportState::default();
        assert_eq!(
            display.element_rect(&state),
            ElementRect::new(0.0, 0.0, 800.0, 600.0)
        );

        let state = ViewportState::new(2.0, Point::new(10.0, -20.0));
        let rect = display.element_rect(&state);
        assert_eq!(rect, ElementRect::new(-390.0, -320.0, 1600.0, 1200.0));
        // Panning right and up moves the image; the viewport center now
        // lands left of and below the image center.
        let p = display.to_image(viewport.center(), &state);
        assert!(close(p, Point::new(790.0, 620.0)));
    }
}
