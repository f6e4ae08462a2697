//! Resize parameters: the resampling filter and the width/height form.
//!
//! [`ResizeForm`] models the two text inputs and the aspect-lock toggle.
//! It only derives one field from the other; it never resizes anything.
//! The compositor does the actual resampling at commit time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, ValidationError};

/// Resampling filter used when scaling an image to a new size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: blocky, keeps hard pixel edges.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic (Catmull-Rom), comparable to a browser's smoothed canvas.
    #[default]
    CatmullRom,
    /// Gaussian: soft.
    Gaussian,
    /// Lanczos with 3 lobes: sharpest, slowest.
    Lanczos3,
}

impl ResampleFilter {
    /// Every filter, fastest first.
    pub const ALL: [Self; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    /// Convert to the `image` crate's `FilterType`.
    #[must_use]
    pub const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown resample filter {s:?} (expected one of Nearest, Triangle, CatmullRom, Gaussian, Lanczos3)")
            })
    }
}

/// Parse the leading integer of `text` the way a browser's
/// `parseInt(text, 10)` does: skip leading whitespace, accept an optional
/// sign, then take digits up to the first non-digit.
///
/// Returns `None` when there are no digits (the `NaN` case).
#[must_use]
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long inputs instead of failing; they are rejected
    // later as out of range anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse one dimension field: a positive integer that fits in `u32`.
fn parse_axis(text: &str) -> Option<u32> {
    parse_leading_int(text)
        .filter(|&v| v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

/// Validate a width/height pair of text fields.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDimension`] if either field has no
/// leading integer or is not positive.
pub fn parse_dimensions(width: &str, height: &str) -> Result<Dimensions, ValidationError> {
    match (parse_axis(width), parse_axis(height)) {
        (Some(w), Some(h)) => Dimensions::new(w, h),
        _ => Err(ValidationError::InvalidDimension(format!(
            "{:?} x {:?}",
            width.trim(),
            height.trim()
        ))),
    }
}

/// Output-size preset shown next to the resize form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Hd720,
    Hd1080,
    Uhd4k,
}

impl Resolution {
    pub const ALL: [Self; 3] = [Self::Hd720, Self::Hd1080, Self::Uhd4k];

    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Uhd4k => (3840, 2160),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4K",
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown resolution preset {s:?} (expected 720p, 1080p, or 4K)"))
    }
}

/// Width/height text fields with an optional aspect lock.
///
/// With the lock on, editing one field derives the other from the base
/// dimensions (the current image's native size). Inputs that do not
/// parse to a positive integer are stored verbatim and derive nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeForm {
    width: String,
    height: String,
    lock_aspect: bool,
    base: Option<Dimensions>,
}

impl Default for ResizeForm {
    fn default() -> Self {
        Self {
            width: String::new(),
            height: String::new(),
            lock_aspect: true,
            base: None,
        }
    }
}

impl ResizeForm {
    #[must_use]
    pub fn width(&self) -> &str {
        &self.width
    }

    #[must_use]
    pub fn height(&self) -> &str {
        &self.height
    }

    #[must_use]
    pub const fn lock_aspect(&self) -> bool {
        self.lock_aspect
    }

    #[must_use]
    pub const fn base(&self) -> Option<Dimensions> {
        self.base
    }

    /// Fill both fields from `dims` and make it the aspect base.
    pub fn reseed(&mut self, dims: Dimensions) {
        self.width = dims.width.to_string();
        self.height = dims.height.to_string();
        self.base = Some(dims);
    }

    /// Empty both fields and forget the base.
    pub fn clear(&mut self) {
        self.width.clear();
        self.height.clear();
        self.base = None;
    }

    /// Edit the width field.
    pub fn set_width(&mut self, text: &str) {
        text.clone_into(&mut self.width);
        if let Some(height) = self.derive(text, |b| f64::from(b.height) / f64::from(b.width)) {
            self.height = height;
        }
    }

    /// Edit the height field.
    pub fn set_height(&mut self, text: &str) {
        text.clone_into(&mut self.height);
        if let Some(width) = self.derive(text, |b| f64::from(b.width) / f64::from(b.height)) {
            self.width = width;
        }
    }

    /// Toggle the aspect lock. Turning it on re-derives the height from
    /// the current width.
    pub fn set_lock_aspect(&mut self, lock: bool) {
        self.lock_aspect = lock;
        if lock {
            let width = self.width.clone();
            if let Some(height) = self.derive(&width, |b| f64::from(b.height) / f64::from(b.width)) {
                self.height = height;
            }
        }
    }

    /// Apply a resolution preset: both fields are set and the lock is
    /// released so the preset's own ratio is kept.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        let (w, h) = resolution.dimensions();
        self.width = w.to_string();
        self.height = h.to_string();
        self.lock_aspect = false;
    }

    /// Validate the current field contents.
    ///
    /// # Errors
    ///
    /// See [`parse_dimensions`].
    pub fn target(&self) -> Result<Dimensions, ValidationError> {
        parse_dimensions(&self.width, &self.height)
    }

    /// `round(value * ratio)` as a string, when locked and `text` is a
    /// positive integer.
    fn derive(&self, text: &str, ratio: impl Fn(Dimensions) -> f64) -> Option<String> {
        if !self.lock_aspect {
            return None;
        }
        let base = self.base?;
        let value = parse_leading_int(text).filter(|&v| v > 0)?;
        #[allow(clippy::cast_precision_loss)]
        let derived = (value as f64 * ratio(base)).round();
        Some(format!("{derived}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form_for(w: u32, h: u32) -> ResizeForm {
        let mut form = ResizeForm::default();
        form.reseed(Dimensions::new(w, h).unwrap());
        form
    }

    #[test]
    fn parse_int_semantics() {
        assert_eq!(parse_leading_int("800"), Some(800));
        assert_eq!(parse_leading_int("  42px"), Some(42));
        assert_eq!(parse_leading_int("12.9"), Some(12));
        assert_eq!(parse_leading_int("-5"), Some(-5));
        assert_eq!(parse_leading_int("+7"), Some(7));
        assert_eq!(parse_leading_int("NaN"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn parse_dimensions_rejects_non_positive() {
        for (w, h) in [("0", "100"), ("-5", "100"), ("NaN", "100"), ("100", ""), ("100", "abc")] {
            let err = parse_dimensions(w, h).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidDimension(_)), "{w} x {h}");
        }
        assert_eq!(
            parse_dimensions("800", "600").unwrap(),
            Dimensions::new(800, 600).unwrap()
        );
        assert!(parse_dimensions("99999999999", "10").is_err());
    }

    #[test]
    fn locked_width_derives_height() {
        let mut form = form_for(1600, 900);
        form.set_width("800");
        assert_eq!(form.height(), "450");
        form.set_height("900");
        assert_eq!(form.width(), "1600");
    }

    #[test]
    fn locked_height_derives_width() {
        let mut form = form_for(1600, 900);
        form.set_height("450");
        assert_eq!(form.width(), "800");
        assert_eq!(form.height(), "450");
    }

    #[test]
    fn derived_values_round() {
        let mut form = form_for(1000, 333);
        form.set_width("300");
        assert_eq!(form.height(), "100");
        form.set_height("10");
        assert_eq!(form.width(), "30");
    }

    #[test]
    fn invalid_input_derives_nothing() {
        let mut form = form_for(1600, 900);
        form.set_width("abc");
        assert_eq!(form.width(), "abc");
        assert_eq!(form.height(), "900");
        form.set_width("0");
        assert_eq!(form.height(), "900");
    }

    #[test]
    fn unlocked_fields_are_independent() {
        let mut form = form_for(1600, 900);
        form.set_lock_aspect(false);
        form.set_width("100");
        assert_eq!(form.height(), "900");
        form.set_lock_aspect(true);
        assert_eq!(form.height(), "56");
    }

    #[test]
    fn resolution_preset_disables_lock() {
        let mut form = form_for(1000, 1000);
        form.set_resolution(Resolution::Hd1080);
        assert_eq!((form.width(), form.height()), ("1920", "1080"));
        assert!(!form.lock_aspect());
        form.set_width("100");
        assert_eq!(form.height(), "1080");
        assert_eq!("4k".parse::<Resolution>().unwrap(), Resolution::Uhd4k);
    }

    #[test]
    fn filter_parsing() {
        assert_eq!("lanczos3".parse::<ResampleFilter>().unwrap(), ResampleFilter::Lanczos3);
        assert_eq!(ResampleFilter::default(), ResampleFilter::CatmullRom);
        assert!("bogus".parse::<ResampleFilter>().is_err());
    }
}
