//! WASM bindings for the atelier editing session.
//!
//! The browser shell owns the DOM, the network, and IndexedDB. It forwards
//! user input to a [`WebSession`] and re-renders from
//! [`WebSession::snapshot_json`] after every call. Rectangles are passed
//! as `left, top, width, height` numbers straight from
//! `getBoundingClientRect()`.
//!
//! Inpainting is two-phase: [`WebSession::begin_inpaint`] returns a plain
//! object with the request payload and a `generation` number. The shell
//! performs the fetch and hands the result back to
//! [`WebSession::complete_inpaint`] or [`WebSession::fail_inpaint`] with
//! that same generation. Results for a generation the session has moved
//! past are dropped.
//!
//! Errors are thrown as JSON strings of the form
//! `{"kind": "...", "detail": "..."}`.

use atelier_core::{
    ActiveTool, Channel, EditorConfig, EditorSession, ElementRect, Generation, InpaintError,
    InpaintOutcome, Point, Preset, RasterImage, Resolution, StudioError,
};
use wasm_bindgen::prelude::*;

/// Module entry point, run once when the WASM module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("atelier: logger already initialized"));
    }
    log::info!("atelier-web {} ready", env!("CARGO_PKG_VERSION"));
}

/// Serialize a core error for throwing across the boundary.
fn to_js(err: &StudioError) -> JsValue {
    let json = serde_json::to_string(err)
        .unwrap_or_else(|ser_err| format!("\"serialization error: {ser_err}\""));
    JsValue::from_str(&json)
}

fn invalid_argument(message: impl Into<String>) -> JsValue {
    to_js(&StudioError::InvalidConfig(message.into()))
}

// JS numbers are f64; ids and generations stay far below 2^53.
#[allow(clippy::cast_precision_loss)]
const fn u64_to_js(value: u64) -> f64 {
    value as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]
fn generation_from_js(value: f64) -> Result<Generation, JsValue> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(Generation(value as u64))
    } else {
        Err(invalid_argument(format!("invalid generation {value}")))
    }
}

const fn rect(left: f64, top: f64, width: f64, height: f64) -> ElementRect {
    ElementRect::new(left, top, width, height)
}

/// An editing session exported to JavaScript.
#[wasm_bindgen]
pub struct WebSession {
    inner: EditorSession,
}

#[wasm_bindgen]
impl WebSession {
    /// Create a session. `config_json` is an optional `EditorConfig`
    /// serialization; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Throws `InvalidConfig` if the JSON does not parse or validate.
    #[wasm_bindgen(constructor)]
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config_json: Option<String>) -> Result<Self, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(|e| to_js(&e))?,
            None => EditorConfig::default(),
        };
        Ok(Self {
            inner: EditorSession::new(config),
        })
    }

    // --- observable state ------------------------------------------------

    /// Everything the shell renders, as a JSON string.
    ///
    /// # Errors
    ///
    /// Throws if serialization fails.
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.snapshot())
            .map_err(|e| invalid_argument(format!("snapshot serialization failed: {e}")))
    }

    /// Encoded bytes of the current image, if any.
    #[wasm_bindgen(js_name = imageBytes)]
    #[must_use]
    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        self.inner.current().map(|c| c.bytes().to_vec())
    }

    #[wasm_bindgen(js_name = imageMime)]
    #[must_use]
    pub fn image_mime(&self) -> Option<String> {
        self.inner.current().map(|c| c.mime().to_owned())
    }

    /// CSS `filter` value for previewing the pending adjustments.
    #[wasm_bindgen(js_name = filterExpression)]
    #[must_use]
    pub fn filter_expression(&self) -> String {
        self.inner.filter_expression()
    }

    /// CSS `cursor` value for the viewport.
    #[must_use]
    pub fn cursor(&self) -> String {
        self.inner.cursor_hint().as_css().to_owned()
    }

    #[wasm_bindgen(js_name = clearStatus)]
    pub fn clear_status(&mut self) {
        self.inner.clear_status();
    }

    // --- loading ---------------------------------------------------------

    /// Replace the session with a new image. Returns its id.
    ///
    /// # Errors
    ///
    /// Throws `EmptyInput` or `Decode`; the previous image is kept.
    pub fn load(&mut self, bytes: Vec<u8>, mime: &str) -> Result<f64, JsValue> {
        self.inner
            .load_image(bytes, mime)
            .map(|id| u64_to_js(id.get()))
            .map_err(|e| to_js(&e))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    // --- tools and settings ---------------------------------------------

    /// Switch to `resize`, `adjust`, or `inpaint`.
    ///
    /// # Errors
    ///
    /// Throws on an unknown tool name.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, name: &str) -> Result<(), JsValue> {
        let tool = name.parse::<ActiveTool>().map_err(invalid_argument)?;
        self.inner.set_tool(tool);
        Ok(())
    }

    #[wasm_bindgen(js_name = setBrushSize)]
    pub fn set_brush_size(&mut self, size: f64) {
        self.inner.set_brush_size(size);
    }

    #[wasm_bindgen(js_name = setInstruction)]
    pub fn set_instruction(&mut self, text: &str) {
        self.inner.set_instruction(text);
    }

    /// Move one slider. Slider values arrive as numbers and are
    /// truncated toward zero, then clamped to the channel range.
    ///
    /// # Errors
    ///
    /// Throws on an unknown channel name.
    #[wasm_bindgen(js_name = setAdjustment)]
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_adjustment(&mut self, channel: &str, value: f64) -> Result<(), JsValue> {
        let channel = channel
            .parse::<Channel>()
            .map_err(|e| invalid_argument(e.to_string()))?;
        if value.is_finite() {
            self.inner.set_adjustment(channel, value as i64);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Throws on an unknown preset name.
    #[wasm_bindgen(js_name = applyPreset)]
    pub fn apply_preset(&mut self, name: &str) -> Result<(), JsValue> {
        let preset =
            Preset::find(name).ok_or_else(|| invalid_argument(format!("unknown preset {name:?}")))?;
        self.inner.apply_preset(preset);
        Ok(())
    }

    /// Names of the built-in presets, in display order.
    #[wasm_bindgen(js_name = presetNames)]
    #[must_use]
    pub fn preset_names() -> Vec<String> {
        atelier_core::PRESETS
            .iter()
            .map(|p| p.name.to_owned())
            .collect()
    }

    #[wasm_bindgen(js_name = resetEdits)]
    pub fn reset_edits(&mut self) {
        self.inner.reset_edits();
    }

    #[wasm_bindgen(js_name = setResizeWidth)]
    pub fn set_resize_width(&mut self, text: &str) {
        self.inner.set_resize_width(text);
    }

    #[wasm_bindgen(js_name = setResizeHeight)]
    pub fn set_resize_height(&mut self, text: &str) {
        self.inner.set_resize_height(text);
    }

    #[wasm_bindgen(js_name = setLockAspect)]
    pub fn set_lock_aspect(&mut self, lock: bool) {
        self.inner.set_lock_aspect(lock);
    }

    /// # Errors
    ///
    /// Throws on an unknown resolution name.
    #[wasm_bindgen(js_name = setResolution)]
    pub fn set_resolution(&mut self, name: &str) -> Result<(), JsValue> {
        let resolution = name.parse::<Resolution>().map_err(invalid_argument)?;
        self.inner.set_resolution(resolution);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearMask)]
    pub fn clear_mask(&mut self) {
        self.inner.clear_mask();
    }

    // --- input -------------------------------------------------------------

    /// `element_*` is the image element's bounding rectangle.
    #[wasm_bindgen(js_name = pointerDown)]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        element_left: f64,
        element_top: f64,
        element_width: f64,
        element_height: f64,
    ) {
        let element = rect(element_left, element_top, element_width, element_height);
        self.inner.pointer_down(Point::new(x, y), button, &element);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(
        &mut self,
        x: f64,
        y: f64,
        element_left: f64,
        element_top: f64,
        element_width: f64,
        element_height: f64,
    ) {
        let element = rect(element_left, element_top, element_width, element_height);
        self.inner.pointer_move(Point::new(x, y), &element);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.inner.pointer_up();
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) {
        self.inner.pointer_leave();
    }

    /// `viewport_*` is the container's bounding rectangle. Returns `true`
    /// when the shell must call `preventDefault()`.
    #[allow(clippy::too_many_arguments)]
    pub fn wheel(
        &mut self,
        delta_y: f64,
        x: f64,
        y: f64,
        viewport_left: f64,
        viewport_top: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) -> bool {
        let viewport = rect(viewport_left, viewport_top, viewport_width, viewport_height);
        self.inner.wheel(delta_y, Point::new(x, y), &viewport)
    }

    pub fn hover(
        &mut self,
        x: f64,
        y: f64,
        viewport_left: f64,
        viewport_top: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) {
        let viewport = rect(viewport_left, viewport_top, viewport_width, viewport_height);
        self.inner.hover(Point::new(x, y), &viewport);
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) {
        self.inner.zoom_in();
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) {
        self.inner.zoom_out();
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&mut self) {
        self.inner.reset_view();
    }

    // --- commits -----------------------------------------------------------

    /// Bake the pending adjustments. Returns the new image id.
    ///
    /// # Errors
    ///
    /// Throws `NoImage`, `Busy`, or a compositor error.
    #[wasm_bindgen(js_name = applyEdits)]
    pub fn apply_edits(&mut self) -> Result<f64, JsValue> {
        self.inner
            .apply_edits()
            .map(|id| u64_to_js(id.get()))
            .map_err(|e| to_js(&e))
    }

    /// Resize to the form's dimensions. Returns the new image id.
    ///
    /// # Errors
    ///
    /// Throws `InvalidDimension`, `NoImage`, `Busy`, or a compositor error.
    #[wasm_bindgen(js_name = applyResize)]
    pub fn apply_resize(&mut self) -> Result<f64, JsValue> {
        self.inner
            .apply_resize()
            .map(|id| u64_to_js(id.get()))
            .map_err(|e| to_js(&e))
    }

    /// Resize to explicit numeric dimensions.
    ///
    /// # Errors
    ///
    /// Throws `InvalidDimension` for NaN, non-positive, or fractional
    /// values, plus the [`apply_resize`](Self::apply_resize) errors.
    #[wasm_bindgen(js_name = resizeTo)]
    pub fn resize_to(&mut self, width: f64, height: f64) -> Result<f64, JsValue> {
        self.inner
            .resize_to(width, height)
            .map(|id| u64_to_js(id.get()))
            .map_err(|e| to_js(&e))
    }

    /// Returns `false` when there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Throws `Busy` while an inpaint is in flight.
    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.inner.undo().map_err(|e| to_js(&e))
    }

    /// The flattened black-and-white mask as PNG bytes.
    ///
    /// # Errors
    ///
    /// Throws `NoImage` or `EmptyMask`.
    #[wasm_bindgen(js_name = maskPng)]
    pub fn mask_png(&self) -> Result<Vec<u8>, JsValue> {
        self.inner
            .extract_mask()
            .map(|m| m.bytes().to_vec())
            .map_err(|e| to_js(&e))
    }

    // --- inpainting ----------------------------------------------------------

    /// Start an inpaint request. Returns
    /// `{generation, base, baseMime, mask, instruction}` where `base` and
    /// `mask` are `Uint8Array`s.
    ///
    /// # Errors
    ///
    /// Throws `NoImage`, `Busy`, `EmptyInstruction`, or `EmptyMask`.
    #[wasm_bindgen(js_name = beginInpaint)]
    pub fn begin_inpaint(&mut self) -> Result<js_sys::Object, JsValue> {
        let ticket = self.inner.begin_inpaint().map_err(|e| to_js(&e))?;
        let request = js_sys::Object::new();
        let set = |key: &str, val: &JsValue| -> Result<(), JsValue> {
            js_sys::Reflect::set(&request, &JsValue::from_str(key), val).map(|_| ())
        };
        set(
            "generation",
            &JsValue::from_f64(u64_to_js(ticket.generation().0)),
        )?;
        set("base", &js_sys::Uint8Array::from(ticket.base().bytes()))?;
        set("baseMime", &JsValue::from_str(ticket.base().mime()))?;
        set("mask", &js_sys::Uint8Array::from(ticket.mask().bytes()))?;
        set("instruction", &JsValue::from_str(ticket.instruction()))?;
        Ok(request)
    }

    /// Deliver a successful inpaint result. Returns `false` if the result
    /// was stale and dropped.
    ///
    /// # Errors
    ///
    /// Throws `Decode` if the bytes are not an image.
    #[wasm_bindgen(js_name = completeInpaint)]
    pub fn complete_inpaint(
        &mut self,
        generation: f64,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<bool, JsValue> {
        let generation = generation_from_js(generation)?;
        let outcome = self
            .inner
            .complete_inpaint(generation, Ok(RasterImage::new(bytes, mime)))
            .map_err(|e| to_js(&e))?;
        Ok(matches!(outcome, InpaintOutcome::Applied(_)))
    }

    /// Deliver a failed inpaint request. The message is surfaced in the
    /// error slot and thrown back, unless the request was stale.
    ///
    /// # Errors
    ///
    /// Throws `External` with `message`.
    #[wasm_bindgen(js_name = failInpaint)]
    pub fn fail_inpaint(&mut self, generation: f64, message: &str) -> Result<bool, JsValue> {
        let generation = generation_from_js(generation)?;
        let outcome = self
            .inner
            .complete_inpaint(generation, Err(InpaintError::new(message)))
            .map_err(|e| to_js(&e))?;
        Ok(matches!(outcome, InpaintOutcome::Applied(_)))
    }
}
