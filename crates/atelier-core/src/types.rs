//! Shared types for the atelier editing core.

use std::fmt;
use std::ops;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand decoded pixels
/// around without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point. Depending on context this is either a screen position
/// (CSS pixels) or a position in the image's native pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let d = self - other;
        d.x.hypot(d.y)
    }
}

impl ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl ops::Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Image dimensions in pixels. Both axes are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Validate a pair of integer dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDimension`] if either axis is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, ValidationError> {
        if width == 0 || height == 0 {
            return Err(ValidationError::InvalidDimension(format!("{width}x{height}")));
        }
        Ok(Self { width, height })
    }

    /// Validate a pair of numeric dimensions coming from an untyped
    /// boundary (JS numbers, JSON).
    ///
    /// NaN, infinities, non-positive values, fractional values, and
    /// values beyond `u32::MAX` are all rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDimension`] on any of the above.
    pub fn from_f64(width: f64, height: f64) -> Result<Self, ValidationError> {
        let axis = |v: f64| -> Option<u32> {
            if !v.is_finite() || v < 1.0 || v.fract() != 0.0 || v > f64::from(u32::MAX) {
                return None;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(v as u32)
        };
        match (axis(width), axis(height)) {
            (Some(w), Some(h)) => Self::new(w, h),
            _ => Err(ValidationError::InvalidDimension(format!("{width}x{height}"))),
        }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an image payload.
///
/// A fresh id is allocated for every new payload; undo restores a
/// snapshot together with its original id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(u64);

impl ImageId {
    /// Allocate the next identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}", self.0)
    }
}

/// An encoded image payload with its declared MIME type.
///
/// The byte buffer is shared and never mutated; every edit produces a
/// new `RasterImage` with a new [`ImageId`]. Cloning is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    id: ImageId,
    mime: String,
    bytes: Arc<[u8]>,
    dimensions: Option<Dimensions>,
}

impl RasterImage {
    /// Wrap an encoded payload under a fresh identifier. Dimensions are
    /// unknown until the payload has been decoded.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<String>) -> Self {
        Self {
            id: ImageId::next(),
            mime: mime.into(),
            bytes: bytes.into(),
            dimensions: None,
        }
    }

    /// Attach decoded dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Identifier of this payload.
    #[must_use]
    pub const fn id(&self) -> ImageId {
        self.id
    }

    /// Declared MIME type, e.g. `image/png`.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Native pixel dimensions, if the payload has been decoded.
    #[must_use]
    pub const fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Whether a failure should be surfaced as an error or as a softer
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A user input was rejected before any state was touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A width or height was missing, non-numeric, or not positive.
    #[error("width and height must be positive integers (got {0})")]
    InvalidDimension(String),

    /// The mask has no painted pixels.
    #[error("paint the area to edit before applying")]
    EmptyMask,

    /// The inpaint instruction is blank.
    #[error("describe the change to make inside the mask")]
    EmptyInstruction,

    /// The operation needs a current image.
    #[error("no image is loaded")]
    NoImage,
}

/// Errors produced by editor operations.
///
/// Every destructive operation that returns one of these leaves the
/// current image, viewport, and history exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum StudioError {
    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The payload could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A drawing surface could not be acquired or the result could not
    /// be encoded.
    #[error("compositor failure: {0}")]
    Compositor(String),

    /// The external inpainting call failed.
    #[error("inpainting failed: {0}")]
    External(String),

    /// An inpainting request is still in flight.
    #[error("an inpainting request is already in progress")]
    Busy,

    /// Editor configuration is invalid.
    #[error("invalid editor configuration: {0}")]
    InvalidConfig(String),
}

impl StudioError {
    /// How the shell should surface this failure.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Validation(ValidationError::EmptyMask) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl From<image::ImageError> for StudioError {
    fn from(e: image::ImageError) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_reject_zero() {
        assert!(Dimensions::new(0, 10).is_err());
        assert!(Dimensions::new(10, 0).is_err());
        assert_eq!(
            Dimensions::new(4, 3).unwrap(),
            Dimensions {
                width: 4,
                height: 3
            }
        );
    }

    #[test]
    fn dimensions_from_f64_rejects_bad_numbers() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY, 12.5, 5e10] {
            assert!(Dimensions::from_f64(bad, 10.0).is_err(), "{bad} accepted");
            assert!(Dimensions::from_f64(10.0, bad).is_err(), "{bad} accepted");
        }
        assert_eq!(
            Dimensions::from_f64(800.0, 600.0).unwrap(),
            Dimensions::new(800, 600).unwrap()
        );
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::new(1920, 1080).unwrap().to_string(), "1920x1080");
    }

    #[test]
    fn image_ids_are_unique() {
        let a = RasterImage::new(vec![1, 2, 3], "image/png");
        let b = RasterImage::new(vec![1, 2, 3], "image/png");
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
    }

    #[test]
    fn raster_clone_shares_payload() {
        let a = RasterImage::new(vec![9u8; 16], "image/png");
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert!(std::ptr::eq(a.bytes().as_ptr(), b.bytes().as_ptr()));
    }

    #[test]
    fn empty_mask_is_a_warning() {
        assert_eq!(
            StudioError::from(ValidationError::EmptyMask).severity(),
            Severity::Warning
        );
        assert_eq!(StudioError::Busy.severity(), Severity::Error);
    }

    #[test]
    fn error_serde_round_trip() {
        let err = StudioError::from(ValidationError::InvalidDimension("0x5".into()));
        let json = serde_json::to_string(&err).unwrap();
        let back: StudioError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
        assert!(err.to_string().contains("positive"));
    }
}
