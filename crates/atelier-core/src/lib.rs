//! atelier-core: raster editing and masking core (sans-IO).
//!
//! Everything the image studio does to pixels locally lives here:
//!
//! - viewport zoom/pan and screen-to-image coordinate mapping
//! - freehand mask painting for localized inpainting
//! - CSS-style color adjustments, previewed as a filter string and baked
//!   into pixels on commit
//! - resize with aspect-locked form fields
//! - a linear undo history of whole-image snapshots
//!
//! [`EditorSession`] ties these together and is what shells drive.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte buffers. The generative-image API sits behind
//! [`InpaintClient`], and durable gallery storage behind
//! [`CreationStore`]; both are implemented by the shells.

pub mod adjust;
pub mod compositor;
pub mod config;
pub mod gallery;
pub mod history;
pub mod inpaint;
pub mod mask;
pub mod resample;
pub mod session;
pub mod transform;
pub mod types;
pub mod viewport;

pub use adjust::{AdjustmentVector, Channel, FilterChain, PRESETS, Preset, generate_filter_expression};
pub use config::EditorConfig;
pub use gallery::{AspectRatio, Creation, CreationStore, Gallery, MemoryStore, ModelTag, StoreError};
pub use history::EditHistory;
pub use inpaint::{Generation, InpaintClient, InpaintError, InpaintOutcome, InpaintTicket};
pub use mask::MaskSurface;
pub use resample::{ResampleFilter, ResizeForm, Resolution};
pub use session::{ActiveTool, EditorSession, SessionSnapshot, StatusSlot};
pub use transform::{DisplayTransform, ElementRect, image_to_screen, screen_to_image};
pub use types::{Dimensions, ImageId, Point, RasterImage, Severity, StudioError, ValidationError};
pub use viewport::{CursorHint, ViewportController, ViewportState};
