//! The editing session: one current image and everything that acts on it.
//!
//! [`EditorSession`] is the single owner of the current [`RasterImage`],
//! the viewport, the mask, the pending adjustments, the resize form, and
//! the undo history. Shells feed it pointer/wheel/hover events and call
//! its commit operations; it decides which subsystem an event belongs to
//! based on the [`ActiveTool`].
//!
//! Every commit is transactional. The current image is pushed onto the
//! history first and the push is rolled back if anything fails, so a
//! failed operation leaves the image, viewport, and history untouched.
//! Failures are also mirrored into an error/warning slot the shell can
//! render.

use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::adjust::{AdjustmentVector, Channel, Preset, generate_filter_expression};
use crate::compositor;
use crate::config::EditorConfig;
use crate::history::EditHistory;
use crate::inpaint::{Generation, InpaintClient, InpaintError, InpaintOutcome, InpaintTicket};
use crate::mask::MaskSurface;
use crate::resample::{Resolution, ResizeForm};
use crate::transform::ElementRect;
use crate::types::{
    Dimensions, ImageId, Point, RasterImage, Severity, StudioError, ValidationError,
};
use crate::viewport::{CursorHint, ViewportController, ViewportState};

/// Primary mouse button as reported by `MouseEvent.button`.
pub const PRIMARY_BUTTON: i16 = 0;

/// Which editing panel is active. Decides how pointer input is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTool {
    /// Resize form; pointer input pans.
    #[default]
    Resize,
    /// Color adjustments; pointer input pans.
    Adjust,
    /// Mask painting; pointer input paints and wheel zoom is off.
    Inpaint,
}

impl fmt::Display for ActiveTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resize => f.write_str("resize"),
            Self::Adjust => f.write_str("adjust"),
            Self::Inpaint => f.write_str("inpaint"),
        }
    }
}

impl std::str::FromStr for ActiveTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resize" => Ok(Self::Resize),
            "adjust" | "edit" => Ok(Self::Adjust),
            "inpaint" | "mask" => Ok(Self::Inpaint),
            other => Err(format!("unknown tool {other:?}")),
        }
    }
}

/// Last failure, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSlot {
    pub error: Option<String>,
    pub warning: Option<String>,
}

/// Serializable view of everything a shell renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub image_id: Option<ImageId>,
    pub mime: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub tool: ActiveTool,
    pub zoom: f64,
    pub pan: Point,
    pub offset: Point,
    pub viewport_is_reset: bool,
    pub cursor: CursorHint,
    pub adjustments: AdjustmentVector,
    /// Name of the preset the adjustments currently equal, if any.
    pub preset: Option<String>,
    pub filter: String,
    pub editing: bool,
    pub brush_size: f64,
    pub instruction: String,
    pub mask_has_content: bool,
    pub history_depth: usize,
    pub busy: bool,
    pub resize: ResizeForm,
    pub status: StatusSlot,
}

/// One editing session.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    current: Option<RasterImage>,
    viewport: ViewportController,
    mask: Option<MaskSurface>,
    adjustments: AdjustmentVector,
    history: EditHistory,
    resize: ResizeForm,
    tool: ActiveTool,
    brush_size: f64,
    instruction: String,
    generation: Generation,
    pending: Option<PendingInpaint>,
    status: StatusSlot,
}

/// An inpaint request between `begin_inpaint` and `complete_inpaint`.
#[derive(Debug)]
struct PendingInpaint {
    generation: Generation,
    /// Snapshot the history cap dropped when the base was pushed.
    evicted: Option<RasterImage>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            viewport: ViewportController::new(&config),
            history: EditHistory::new(config.history_limit),
            brush_size: config.brush_size,
            config,
            current: None,
            mask: None,
            adjustments: AdjustmentVector::DEFAULT,
            resize: ResizeForm::default(),
            tool: ActiveTool::default(),
            instruction: String::new(),
            generation: Generation::default(),
            pending: None,
            status: StatusSlot::default(),
        }
    }

    // -----------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------

    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub const fn current(&self) -> Option<&RasterImage> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    /// Pan plus hover parallax, for rendering only.
    #[must_use]
    pub fn effective_offset(&self) -> Point {
        self.viewport.effective_offset()
    }

    #[must_use]
    pub const fn adjustments(&self) -> AdjustmentVector {
        self.adjustments
    }

    /// CSS filter string to preview the pending adjustments with.
    #[must_use]
    pub fn filter_expression(&self) -> String {
        generate_filter_expression(&self.adjustments)
    }

    /// `true` while the adjustments differ from neutral.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        !self.adjustments.is_default()
    }

    #[must_use]
    pub fn mask_has_content(&self) -> bool {
        self.mask.as_ref().is_some_and(MaskSurface::has_content)
    }

    #[must_use]
    pub const fn mask(&self) -> Option<&MaskSurface> {
        self.mask.as_ref()
    }

    #[must_use]
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub const fn resize_form(&self) -> &ResizeForm {
        &self.resize
    }

    #[must_use]
    pub const fn tool(&self) -> ActiveTool {
        self.tool
    }

    #[must_use]
    pub const fn brush_size(&self) -> f64 {
        self.brush_size
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// `true` while an inpaint request is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub const fn status(&self) -> &StatusSlot {
        &self.status
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        self.status.warning.as_deref()
    }

    /// Dismiss the error and warning.
    pub fn clear_status(&mut self) {
        self.status = StatusSlot::default();
    }

    /// What the cursor should look like over the viewport.
    #[must_use]
    pub const fn cursor_hint(&self) -> CursorHint {
        if self.current.is_none() {
            CursorHint::Default
        } else if matches!(self.tool, ActiveTool::Inpaint) {
            CursorHint::None
        } else if self.viewport.is_dragging() {
            CursorHint::Grabbing
        } else {
            CursorHint::Grab
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.viewport.state();
        SessionSnapshot {
            image_id: self.current.as_ref().map(RasterImage::id),
            mime: self.current.as_ref().map(|c| c.mime().to_owned()),
            dimensions: self.current.as_ref().and_then(RasterImage::dimensions),
            tool: self.tool,
            zoom: state.zoom(),
            pan: state.pan(),
            offset: self.effective_offset(),
            viewport_is_reset: state.is_reset(),
            cursor: self.cursor_hint(),
            adjustments: self.adjustments,
            preset: Preset::matching(&self.adjustments).map(|p| p.name.to_owned()),
            filter: self.filter_expression(),
            editing: self.is_editing(),
            brush_size: self.brush_size,
            instruction: self.instruction.clone(),
            mask_has_content: self.mask_has_content(),
            history_depth: self.history.len(),
            busy: self.is_busy(),
            resize: self.resize.clone(),
            status: self.status.clone(),
        }
    }

    // -----------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------

    /// Make `bytes` the current image, discarding all session state.
    ///
    /// An empty or unrecognized `mime` is replaced by one sniffed from
    /// the payload. Any in-flight inpaint request becomes stale.
    ///
    /// # Errors
    ///
    /// Returns the [`compositor::decode`] errors. The session is left
    /// unchanged on failure.
    pub fn load_image(&mut self, bytes: Vec<u8>, mime: &str) -> Result<ImageId, StudioError> {
        let mime = if compositor::can_encode(mime) || mime.starts_with("image/") {
            mime.to_owned()
        } else {
            compositor::sniff_mime(&bytes).unwrap_or("image/png").to_owned()
        };
        self.load_raster(RasterImage::new(bytes, mime))
    }

    /// Like [`load_image`](Self::load_image) for an already-wrapped payload.
    ///
    /// # Errors
    ///
    /// Returns the [`compositor::decode`] errors, or
    /// [`StudioError::Compositor`] for an image over the pixel limit.
    pub fn load_raster(&mut self, image: RasterImage) -> Result<ImageId, StudioError> {
        let checked = compositor::header_dimensions(image.bytes())
            .and_then(|d| compositor::check_surface(d, self.config.max_surface_pixels));
        if let Err(e) = checked {
            return self.fail(e);
        }
        let dims = match compositor::probe_dimensions(image.bytes()) {
            Ok(d) => d,
            Err(e) => return self.fail(e),
        };
        let mask = match MaskSurface::new(dims) {
            Ok(m) => m,
            Err(e) => return self.fail(e),
        };
        self.reset_state();
        let image = image.with_dimensions(dims);
        let id = image.id();
        info!("loaded {id} ({dims}, {})", image.mime());
        self.resize.reseed(dims);
        self.mask = Some(mask);
        self.current = Some(image);
        Ok(id)
    }

    /// Drop the current image and reset every piece of session state.
    pub fn clear(&mut self) {
        self.reset_state();
        debug!("session cleared");
    }

    fn reset_state(&mut self) {
        if self.pending.take().is_some() {
            debug!("superseding in-flight inpaint request");
        }
        self.generation = self.generation.next();
        self.current = None;
        self.mask = None;
        self.adjustments = AdjustmentVector::DEFAULT;
        self.history.clear();
        self.resize.clear();
        self.tool = ActiveTool::default();
        self.instruction.clear();
        self.viewport.reset();
        self.status = StatusSlot::default();
    }

    // -----------------------------------------------------------------
    // Tools and settings
    // -----------------------------------------------------------------

    /// Switch the active tool. Entering mask painting starts from a
    /// clean mask.
    pub fn set_tool(&mut self, tool: ActiveTool) {
        if tool == self.tool {
            return;
        }
        self.viewport.end_drag();
        if tool == ActiveTool::Inpaint {
            if let Some(mask) = &mut self.mask {
                mask.clear();
            }
            self.viewport.clear_parallax();
        } else if let Some(mask) = &mut self.mask {
            mask.end_stroke();
        }
        debug!("tool {} -> {tool}", self.tool);
        self.tool = tool;
    }

    /// Brush diameter in screen pixels; values below 1 are raised to 1.
    pub fn set_brush_size(&mut self, size: f64) {
        if size.is_finite() {
            self.brush_size = size.max(1.0);
        }
    }

    pub fn set_instruction(&mut self, text: &str) {
        text.clone_into(&mut self.instruction);
    }

    /// Move one slider. The value is clamped to the channel range.
    pub fn set_adjustment(&mut self, channel: Channel, value: i64) {
        self.adjustments.set(channel, value);
    }

    /// Replace the whole adjustment vector.
    pub const fn set_adjustments(&mut self, adjustments: AdjustmentVector) {
        self.adjustments = adjustments;
    }

    /// Replace the adjustment vector with a preset's.
    pub const fn apply_preset(&mut self, preset: &Preset) {
        self.adjustments = preset.adjustments;
    }

    /// Discard pending adjustments. History is not touched.
    pub const fn reset_edits(&mut self) {
        self.adjustments = AdjustmentVector::DEFAULT;
    }

    pub fn set_resize_width(&mut self, text: &str) {
        self.resize.set_width(text);
    }

    pub fn set_resize_height(&mut self, text: &str) {
        self.resize.set_height(text);
    }

    pub fn set_lock_aspect(&mut self, lock: bool) {
        self.resize.set_lock_aspect(lock);
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resize.set_resolution(resolution);
    }

    /// Erase the mask.
    pub fn clear_mask(&mut self) {
        if let Some(mask) = &mut self.mask {
            mask.clear();
        }
    }

    // -----------------------------------------------------------------
    // Input routing
    // -----------------------------------------------------------------

    /// Pointer pressed. `element` is the image element's current rendered
    /// rectangle; it is only consulted while painting.
    pub fn pointer_down(&mut self, position: Point, button: i16, element: &ElementRect) {
        if self.current.is_none() || button != PRIMARY_BUTTON {
            return;
        }
        match self.tool {
            ActiveTool::Inpaint => {
                if self.pending.is_some() {
                    return;
                }
                let brush = self.brush_size;
                if let Some(mask) = &mut self.mask {
                    mask.begin_stroke(position, element, brush);
                }
            }
            ActiveTool::Resize | ActiveTool::Adjust => self.viewport.begin_drag(position),
        }
    }

    /// Pointer moved.
    pub fn pointer_move(&mut self, position: Point, element: &ElementRect) {
        match self.tool {
            ActiveTool::Inpaint => {
                let brush = self.brush_size;
                if let Some(mask) = &mut self.mask {
                    mask.continue_stroke(position, element, brush);
                }
            }
            ActiveTool::Resize | ActiveTool::Adjust => {
                self.viewport.drag_to(position);
            }
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        self.viewport.end_drag();
        if let Some(mask) = &mut self.mask {
            mask.end_stroke();
        }
    }

    /// Pointer left the viewport: ends any drag or stroke and collapses
    /// the parallax.
    pub fn pointer_leave(&mut self) {
        self.viewport.leave();
        if let Some(mask) = &mut self.mask {
            mask.end_stroke();
        }
    }

    /// Wheel over the viewport. `cursor` is in screen coordinates and
    /// `viewport` is the container's rectangle.
    ///
    /// Returns `true` if the event was consumed and the shell must
    /// suppress default scrolling.
    pub fn wheel(&mut self, delta_y: f64, cursor: Point, viewport: &ElementRect) -> bool {
        if self.current.is_none() || self.tool == ActiveTool::Inpaint {
            return false;
        }
        self.viewport.wheel_zoom(delta_y, cursor - viewport.center());
        true
    }

    /// Cursor hovering over the viewport, for the parallax effect.
    pub fn hover(&mut self, cursor: Point, viewport: &ElementRect) {
        let suppressed =
            self.current.is_none() || self.pending.is_some() || self.tool == ActiveTool::Inpaint;
        self.viewport.hover(cursor, viewport, suppressed);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    // -----------------------------------------------------------------
    // Commits
    // -----------------------------------------------------------------

    /// Record a failure in the status slot and return it.
    fn fail<T>(&mut self, err: StudioError) -> Result<T, StudioError> {
        let message = err.to_string();
        match err.severity() {
            Severity::Warning => {
                debug!("{message}");
                self.status.warning = Some(message);
            }
            Severity::Error => {
                warn!("{message}");
                self.status.error = Some(message);
            }
        }
        Err(err)
    }

    /// The current image, for an operation that must not overlap an
    /// in-flight inpaint.
    fn idle_image(&self) -> Result<RasterImage, StudioError> {
        if self.pending.is_some() {
            return Err(StudioError::Busy);
        }
        self.current
            .clone()
            .ok_or_else(|| ValidationError::NoImage.into())
    }

    /// Make `next` current. The caller has already pushed history.
    fn replace_current(&mut self, next: RasterImage) -> Result<ImageId, StudioError> {
        let dims = match next.dimensions() {
            Some(d) => d,
            None => compositor::probe_dimensions(next.bytes())?,
        };
        let mask = MaskSurface::new(dims)?;
        let next = next.with_dimensions(dims);
        let id = next.id();
        self.generation = self.generation.next();
        self.mask = Some(mask);
        self.resize.reseed(dims);
        self.viewport.reset();
        self.current = Some(next);
        Ok(id)
    }

    /// Push, produce, replace; roll the push back on any failure.
    fn commit(
        &mut self,
        label: &str,
        produce: impl FnOnce(&Self, &RasterImage) -> Result<RasterImage, StudioError>,
    ) -> Result<ImageId, StudioError> {
        self.status = StatusSlot::default();
        let current = match self.idle_image() {
            Ok(c) => c,
            Err(e) => return self.fail(e),
        };
        let evicted = self.history.push(current.clone());
        let result = produce(self, &current).and_then(|next| self.replace_current(next));
        match result {
            Ok(id) => {
                info!("{label}: {} -> {id}", current.id());
                Ok(id)
            }
            Err(e) => {
                self.history.rollback(evicted);
                warn!("{label} rolled back");
                self.fail(e)
            }
        }
    }

    /// Bake the pending adjustments into the pixels and reset them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoImage`], [`StudioError::Busy`], or a
    /// compositor failure. Adjustments are kept on failure.
    pub fn apply_edits(&mut self) -> Result<ImageId, StudioError> {
        let chain = self.adjustments.filter_chain();
        let id = self.commit("apply edits", |s, current| {
            let dims = current
                .dimensions()
                .map_or_else(|| compositor::probe_dimensions(current.bytes()), Ok)?;
            compositor::rasterize(
                current,
                dims,
                &chain,
                s.config.resample_filter,
                s.config.max_surface_pixels,
            )
        })?;
        self.adjustments = AdjustmentVector::DEFAULT;
        Ok(id)
    }

    /// Resize to the dimensions in the resize form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDimension`] if either field is
    /// not a positive integer, plus the [`resize`](Self::resize) errors.
    pub fn apply_resize(&mut self) -> Result<ImageId, StudioError> {
        match self.resize.target() {
            Ok(target) => self.resize(target),
            Err(e) => {
                self.status = StatusSlot::default();
                self.fail(e.into())
            }
        }
    }

    /// Resize to numeric dimensions from an untyped boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDimension`] for NaN, infinite,
    /// non-positive, or fractional values, plus the
    /// [`resize`](Self::resize) errors.
    pub fn resize_to(&mut self, width: f64, height: f64) -> Result<ImageId, StudioError> {
        match Dimensions::from_f64(width, height) {
            Ok(target) => self.resize(target),
            Err(e) => {
                self.status = StatusSlot::default();
                self.fail(e.into())
            }
        }
    }

    /// Resample the current image to `target`. Pending adjustments are
    /// not applied; they stay pending.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoImage`], [`StudioError::Busy`], or a
    /// compositor failure (including a target above the surface limit).
    pub fn resize(&mut self, target: Dimensions) -> Result<ImageId, StudioError> {
        self.commit("resize", |s, current| {
            compositor::rasterize(
                current,
                target,
                &crate::adjust::FilterChain::default(),
                s.config.resample_filter,
                s.config.max_surface_pixels,
            )
        })
    }

    /// Restore the most recent snapshot. Returns `false` when there is
    /// nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Busy`] during an inpaint, or a decode error
    /// if the snapshot cannot be decoded (the snapshot is kept).
    pub fn undo(&mut self) -> Result<bool, StudioError> {
        if self.pending.is_some() {
            return self.fail(StudioError::Busy);
        }
        let Some(previous) = self.history.pop() else {
            return Ok(false);
        };
        self.status = StatusSlot::default();
        let restored = previous.id();
        let bare = RasterImage::clone(&previous);
        // Re-derive the dimensions from the payload itself.
        let dims = match compositor::probe_dimensions(bare.bytes()) {
            Ok(d) => d,
            Err(e) => {
                self.history.push(previous);
                return self.fail(e);
            }
        };
        if let Err(e) = self.replace_current(bare.with_dimensions(dims)) {
            self.history.push(previous);
            return self.fail(e);
        }
        info!("undo -> {restored} ({} left)", self.history.len());
        Ok(true)
    }

    // -----------------------------------------------------------------
    // Inpainting
    // -----------------------------------------------------------------

    /// Flatten the mask to a black-and-white PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoImage`] or
    /// [`ValidationError::EmptyMask`].
    pub fn extract_mask(&self) -> Result<RasterImage, StudioError> {
        self.mask
            .as_ref()
            .ok_or_else(|| StudioError::from(ValidationError::NoImage))?
            .extract_final_mask()
    }

    /// Validate and start an inpaint request.
    ///
    /// On success the current image is pushed onto the history and the
    /// session is busy until [`complete_inpaint`](Self::complete_inpaint)
    /// is called with the ticket's generation.
    ///
    /// # Errors
    ///
    /// Returns, without touching any state, [`ValidationError::NoImage`],
    /// [`StudioError::Busy`], [`ValidationError::EmptyInstruction`], or
    /// [`ValidationError::EmptyMask`] (a warning).
    pub fn begin_inpaint(&mut self) -> Result<InpaintTicket, StudioError> {
        self.status = StatusSlot::default();
        let base = match self.idle_image() {
            Ok(b) => b,
            Err(e) => return self.fail(e),
        };
        if self.instruction.trim().is_empty() {
            return self.fail(ValidationError::EmptyInstruction.into());
        }
        let mask = match self.extract_mask() {
            Ok(m) => m,
            Err(e) => return self.fail(e),
        };
        let evicted = self.history.push(base.clone());
        self.pending = Some(PendingInpaint {
            generation: self.generation,
            evicted,
        });
        debug!("inpaint started on {} (generation {})", base.id(), self.generation.0);
        Ok(InpaintTicket {
            generation: self.generation,
            base,
            mask,
            instruction: self.instruction.trim().to_owned(),
        })
    }

    /// Deliver the result of a request started by
    /// [`begin_inpaint`](Self::begin_inpaint).
    ///
    /// A result for a superseded generation is dropped and reported as
    /// [`InpaintOutcome::Stale`]. On success the result becomes current,
    /// and the mask and instruction are cleared. On failure the history
    /// push is undone and the mask is kept so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::External`] for a failed request, or a
    /// decode error if the returned payload is not an image.
    pub fn complete_inpaint(
        &mut self,
        generation: Generation,
        result: Result<RasterImage, InpaintError>,
    ) -> Result<InpaintOutcome, StudioError> {
        let pending = match self.pending.take() {
            Some(p) if p.generation == generation && self.generation == generation => p,
            other => {
                self.pending = other;
                debug!("dropping stale inpaint result (generation {})", generation.0);
                return Ok(InpaintOutcome::Stale);
            }
        };
        let replaced = result
            .map_err(|e| StudioError::External(e.message))
            .and_then(|next| self.replace_current(next));
        match replaced {
            Ok(id) => {
                self.instruction.clear();
                info!("inpaint applied -> {id}");
                Ok(InpaintOutcome::Applied(id))
            }
            Err(e) => {
                self.history.rollback(pending.evicted);
                warn!("inpaint rolled back");
                self.fail(e)
            }
        }
    }

    /// Run a whole inpaint through a blocking client.
    ///
    /// # Errors
    ///
    /// Any error from [`begin_inpaint`](Self::begin_inpaint) (the client
    /// is then never called) or [`complete_inpaint`](Self::complete_inpaint).
    pub fn apply_inpaint(&mut self, client: &mut impl InpaintClient) -> Result<ImageId, StudioError> {
        let ticket = self.begin_inpaint()?;
        let result = client.apply_inpaint(ticket.base(), ticket.mask(), ticket.instruction());
        match self.complete_inpaint(ticket.generation(), result)? {
            InpaintOutcome::Applied(id) => Ok(id),
            InpaintOutcome::Stale => Err(StudioError::External("result was superseded".into())),
        }
    }
}
