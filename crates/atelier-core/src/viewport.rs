//! Zoom, pan, and hover parallax for the image viewport.
//!
//! [`ViewportState`] is the authoritative transform: a zoom factor and a
//! pan offset (screen pixels, relative to the viewport center). The
//! [`ViewportController`] owns it together with the transient drag and
//! parallax state, and enforces the zoom bounds from [`EditorConfig`].
//!
//! Parallax is a purely cosmetic offset that follows the hovering cursor.
//! It is kept apart from the pan so it never leaks into the transform
//! used for input mapping.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::transform::ElementRect;
use crate::types::Point;

/// Zoom and pan of the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    zoom: f64,
    pan: Point,
}

impl ViewportState {
    /// Construct a state directly. No clamping is applied.
    #[must_use]
    pub const fn new(zoom: f64, pan: Point) -> Self {
        Self { zoom, pan }
    }

    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub const fn pan(&self) -> Point {
        self.pan
    }

    /// `true` at zoom 1 with no pan.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_reset(&self) -> bool {
        self.zoom == 1.0 && self.pan == Point::ZERO
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(1.0, Point::ZERO)
    }
}

/// Cursor appearance the shell should show over the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorHint {
    /// Nothing to interact with.
    Default,
    /// Pannable.
    Grab,
    /// A pan drag is in progress.
    Grabbing,
    /// Hide the system cursor; the shell draws a brush outline instead.
    None,
}

impl CursorHint {
    /// CSS `cursor` value.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragAnchor {
    press: Point,
    pan_at_press: Point,
}

/// Owns the viewport transform and interprets pan, wheel, button, and
/// hover input against it.
#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ViewportState,
    drag: Option<DragAnchor>,
    parallax: Point,
    min_zoom: f64,
    max_zoom: f64,
    wheel_sensitivity: f64,
    zoom_step: f64,
    parallax_amplitude: f64,
}

impl ViewportController {
    #[must_use]
    pub const fn new(config: &EditorConfig) -> Self {
        Self {
            state: ViewportState::new(1.0, Point::ZERO),
            drag: None,
            parallax: Point::ZERO,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            wheel_sensitivity: config.wheel_sensitivity,
            zoom_step: config.zoom_step,
            parallax_amplitude: config.parallax_amplitude,
        }
    }

    /// Current authoritative transform.
    #[must_use]
    pub const fn state(&self) -> ViewportState {
        self.state
    }

    /// Current parallax offset. Never part of [`state`](Self::state).
    #[must_use]
    pub const fn parallax(&self) -> Point {
        self.parallax
    }

    /// Offset to render with: pan plus parallax.
    #[must_use]
    pub fn effective_offset(&self) -> Point {
        self.state.pan + self.parallax
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.state.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Start a pan drag at `position`.
    pub fn begin_drag(&mut self, position: Point) {
        self.drag = Some(DragAnchor {
            press: position,
            pan_at_press: self.state.pan,
        });
        self.parallax = Point::ZERO;
    }

    /// Follow the pointer during a drag. Returns `false` when no drag is
    /// active.
    pub fn drag_to(&mut self, position: Point) -> bool {
        let Some(anchor) = self.drag else {
            return false;
        };
        self.state.pan = position - anchor.press + anchor.pan_at_press;
        true
    }

    /// Finish a pan drag. Idempotent.
    pub const fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Apply a wheel step.
    ///
    /// `cursor_offset` is the cursor position relative to the viewport
    /// center. The image point under the cursor stays fixed unless the
    /// zoom hits a bound (in which case the ratio actually applied is
    /// used, so the point still stays fixed).
    pub fn wheel_zoom(&mut self, delta_y: f64, cursor_offset: Point) {
        let old_zoom = self.state.zoom;
        let scale = delta_y.mul_add(-self.wheel_sensitivity, 1.0);
        let new_zoom = self.clamp_zoom(old_zoom * scale);
        let ratio = new_zoom / old_zoom;
        self.state.pan = cursor_offset - (cursor_offset - self.state.pan) * ratio;
        self.state.zoom = new_zoom;
    }

    /// Zoom about the viewport center to `target` (clamped).
    pub fn zoom_to(&mut self, target: f64) {
        let old_zoom = self.state.zoom;
        let new_zoom = self.clamp_zoom(target);
        self.state.pan = self.state.pan * (new_zoom / old_zoom);
        self.state.zoom = new_zoom;
    }

    /// Zoom-in button.
    pub fn zoom_in(&mut self) {
        self.zoom_to(self.state.zoom * self.zoom_step);
    }

    /// Zoom-out button.
    pub fn zoom_out(&mut self) {
        self.zoom_to(self.state.zoom / self.zoom_step);
    }

    /// Back to zoom 1 with no pan. Also drops any drag and parallax.
    pub fn reset(&mut self) {
        self.state = ViewportState::default();
        self.drag = None;
        self.parallax = Point::ZERO;
    }

    /// Update the parallax offset from a hover position.
    ///
    /// Each axis is `-amplitude * (cursor - center) / half_extent`, so
    /// the offset reaches the full amplitude at the viewport edge. While
    /// `suppressed` (dragging, busy, painting, no image) the offset is
    /// zero.
    pub fn hover(&mut self, cursor: Point, viewport: &ElementRect, suppressed: bool) {
        if suppressed || self.drag.is_some() || !viewport.is_renderable() {
            self.parallax = Point::ZERO;
            return;
        }
        let half_w = viewport.width / 2.0;
        let half_h = viewport.height / 2.0;
        let rel = cursor - viewport.origin();
        self.parallax = Point::new(
            ((rel.x - half_w) / half_w) * -self.parallax_amplitude,
            ((rel.y - half_h) / half_h) * -self.parallax_amplitude,
        );
    }

    /// Pointer left the viewport: end any drag and collapse parallax.
    pub const fn leave(&mut self) {
        self.drag = None;
        self.parallax = Point::ZERO;
    }

    /// Collapse parallax without touching the pan.
    pub const fn clear_parallax(&mut self) {
        self.parallax = Point::ZERO;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(&EditorConfig::default())
    }

    /// Image-space position (in fitted units, relative to the image
    /// center) displayed under `offset`.
    fn image_point_under(state: ViewportState, offset: Point) -> Point {
        (offset - state.pan()) * (1.0 / state.zoom())
    }

    fn assert_close(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn starts_reset() {
        let c = controller();
        assert!(c.state().is_reset());
        assert_eq!(c.effective_offset(), Point::ZERO);
    }

    #[test]
    fn drag_moves_pan_by_pointer_delta() {
        let mut c = controller();
        c.begin_drag(Point::new(100.0, 100.0));
        assert!(c.drag_to(Point::new(130.0, 80.0)));
        assert_eq!(c.state().pan(), Point::new(30.0, -20.0));
        c.end_drag();

        c.begin_drag(Point::new(0.0, 0.0));
        c.drag_to(Point::new(-10.0, 5.0));
        assert_eq!(c.state().pan(), Point::new(20.0, -15.0));
        c.end_drag();
        assert!(!c.drag_to(Point::new(500.0, 500.0)));
        assert_eq!(c.state().pan(), Point::new(20.0, -15.0));
    }

    #[test]
    fn wheel_zoom_keeps_anchor_fixed_zooming_in() {
        let mut c = controller();
        let cursor = Point::new(120.0, -45.0);
        let before = image_point_under(c.state(), cursor);
        // deltaY of -200 scales by 1.2.
        c.wheel_zoom(-200.0, cursor);
        assert!((c.state().zoom() - 1.2).abs() < 1e-12);
        assert_close(image_point_under(c.state(), cursor), before);
    }

    #[test]
    fn wheel_zoom_keeps_anchor_fixed_zooming_out() {
        let mut c = controller();
        c.zoom_to(2.0);
        c.begin_drag(Point::ZERO);
        c.drag_to(Point::new(40.0, 10.0));
        c.end_drag();
        let cursor = Point::new(-75.0, 60.0);
        let before = image_point_under(c.state(), cursor);
        // deltaY of 600 scales by 0.4: 2.0 -> 0.8.
        c.wheel_zoom(600.0, cursor);
        assert!((c.state().zoom() - 0.8).abs() < 1e-12);
        assert_close(image_point_under(c.state(), cursor), before);
    }

    #[test]
    fn wheel_zoom_clamps_and_still_anchors() {
        let mut c = controller();
        let cursor = Point::new(33.0, 21.0);
        let before = image_point_under(c.state(), cursor);
        c.wheel_zoom(-100_000.0, cursor);
        assert!((c.state().zoom() - 5.0).abs() < f64::EPSILON);
        assert_close(image_point_under(c.state(), cursor), before);

        c.wheel_zoom(100_000.0, cursor);
        assert!((c.state().zoom() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn buttons_scale_pan_about_center() {
        let mut c = controller();
        c.begin_drag(Point::ZERO);
        c.drag_to(Point::new(50.0, -25.0));
        c.end_drag();
        c.zoom_in();
        assert!((c.state().zoom() - 1.2).abs() < 1e-12);
        assert_close(c.state().pan(), Point::new(60.0, -30.0));
        c.zoom_out();
        assert!((c.state().zoom() - 1.0).abs() < 1e-12);
        assert_close(c.state().pan(), Point::new(50.0, -25.0));
    }

    #[test]
    fn zoom_buttons_respect_bounds() {
        let mut c = controller();
        for _ in 0..50 {
            c.zoom_in();
        }
        assert!((c.state().zoom() - 5.0).abs() < f64::EPSILON);
        for _ in 0..50 {
            c.zoom_out();
        }
        assert!((c.state().zoom() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut c = controller();
        c.zoom_in();
        c.reset();
        assert!(c.state().is_reset());
        c.reset();
        assert!(c.state().is_reset());
    }

    #[test]
    fn parallax_is_separate_from_pan() {
        let mut c = controller();
        let viewport = ElementRect::new(0.0, 0.0, 800.0, 600.0);
        c.hover(Point::new(800.0, 0.0), &viewport, false);
        assert_close(c.parallax(), Point::new(-15.0, 15.0));
        assert_eq!(c.state().pan(), Point::ZERO);
        assert_close(c.effective_offset(), Point::new(-15.0, 15.0));

        c.hover(Point::new(400.0, 300.0), &viewport, false);
        assert_close(c.parallax(), Point::ZERO);
    }

    #[test]
    fn parallax_collapses_when_suppressed_or_left() {
        let mut c = controller();
        let viewport = ElementRect::new(0.0, 0.0, 800.0, 600.0);
        c.hover(Point::new(0.0, 0.0), &viewport, false);
        assert_ne!(c.parallax(), Point::ZERO);
        c.hover(Point::new(0.0, 0.0), &viewport, true);
        assert_eq!(c.parallax(), Point::ZERO);

        c.hover(Point::new(0.0, 0.0), &viewport, false);
        c.leave();
        assert_eq!(c.parallax(), Point::ZERO);

        c.begin_drag(Point::new(10.0, 10.0));
        c.hover(Point::new(0.0, 0.0), &viewport, false);
        assert_eq!(c.parallax(), Point::ZERO);
    }

    #[test]
    fn cursor_hint_css() {
        assert_eq!(CursorHint::Grabbing.as_css(), "grabbing");
        assert_eq!(CursorHint::None.as_css(), "none");
    }
}
