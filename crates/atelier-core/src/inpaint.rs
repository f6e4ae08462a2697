//! Boundary to the external inpainting service.
//!
//! The editor never talks to the network. A shell supplies an
//! [`InpaintClient`] for blocking use, or drives the two-phase
//! [`begin_inpaint`](crate::session::EditorSession::begin_inpaint) /
//! [`complete_inpaint`](crate::session::EditorSession::complete_inpaint)
//! pair around its own asynchronous call.

use serde::{Deserialize, Serialize};

use crate::types::{ImageId, RasterImage};

/// The external call failed. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct InpaintError {
    pub message: String,
}

impl InpaintError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Applies an instruction to the white region of a mask.
pub trait InpaintClient {
    /// Return a new image where only the masked region of `base` has been
    /// changed according to `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`InpaintError`] if the request fails for any reason.
    fn apply_inpaint(
        &mut self,
        base: &RasterImage,
        mask: &RasterImage,
        instruction: &str,
    ) -> Result<RasterImage, InpaintError>;
}

impl<F> InpaintClient for F
where
    F: FnMut(&RasterImage, &RasterImage, &str) -> Result<RasterImage, InpaintError>,
{
    fn apply_inpaint(
        &mut self,
        base: &RasterImage,
        mask: &RasterImage,
        instruction: &str,
    ) -> Result<RasterImage, InpaintError> {
        self(base, mask, instruction)
    }
}

/// Monotonic counter identifying which image an async request was made
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Everything an in-flight inpaint request needs, captured at the time
/// the request was started.
#[derive(Debug, Clone)]
pub struct InpaintTicket {
    pub(crate) generation: Generation,
    pub(crate) base: RasterImage,
    pub(crate) mask: RasterImage,
    pub(crate) instruction: String,
}

impl InpaintTicket {
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// The image being edited.
    #[must_use]
    pub const fn base(&self) -> &RasterImage {
        &self.base
    }

    /// Black-and-white PNG; white marks the region to change.
    #[must_use]
    pub const fn mask(&self) -> &RasterImage {
        &self.mask
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// Result of delivering a completion to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InpaintOutcome {
    /// The result became the current image.
    Applied(ImageId),
    /// The session moved on before the result arrived; nothing changed.
    Stale,
}
