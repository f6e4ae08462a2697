//! Color adjustments expressed as a CSS-style filter chain.
//!
//! While the user drags sliders the image is never touched: the shell
//! previews with the CSS `filter` string from
//! [`generate_filter_expression`]. Only on commit are the same primitives
//! applied to real pixels via [`FilterChain::apply_to_rgba`], using the
//! Filter Effects definitions so the committed result matches the
//! preview.
//!
//! Primitives are applied in sequence in sRGB. Each primitive clamps its
//! output to `[0, 1]` before the next one runs; alpha is left untouched.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// One adjustable channel of an [`AdjustmentVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Brightness,
    Contrast,
    Saturate,
    Sepia,
    Grayscale,
}

impl Channel {
    /// All channels in filter-expression order.
    pub const ALL: [Self; 5] = [
        Self::Brightness,
        Self::Contrast,
        Self::Saturate,
        Self::Sepia,
        Self::Grayscale,
    ];

    /// Upper bound of the slider, in percent. The lower bound is 0.
    #[must_use]
    pub const fn max(self) -> u16 {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => 200,
            Self::Sepia | Self::Grayscale => 100,
        }
    }

    /// Neutral value, in percent.
    #[must_use]
    pub const fn neutral(self) -> u16 {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => 100,
            Self::Sepia | Self::Grayscale => 0,
        }
    }

    /// CSS filter function name.
    #[must_use]
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturate => "saturate",
            Self::Sepia => "sepia",
            Self::Grayscale => "grayscale",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

impl FromStr for Channel {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.css_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FilterParseError::UnknownFunction(s.trim().to_owned()))
    }
}

/// The five slider values, in integer percent.
///
/// Every value is kept within its channel's range; setters clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "AdjustmentFields")]
pub struct AdjustmentVector {
    brightness: u16,
    contrast: u16,
    saturate: u16,
    sepia: u16,
    grayscale: u16,
}

/// Unchecked wire form of [`AdjustmentVector`]; clamped on conversion.
#[derive(Deserialize)]
#[serde(default)]
struct AdjustmentFields {
    brightness: i64,
    contrast: i64,
    saturate: i64,
    sepia: i64,
    grayscale: i64,
}

impl Default for AdjustmentFields {
    fn default() -> Self {
        let d = AdjustmentVector::DEFAULT;
        Self {
            brightness: d.brightness.into(),
            contrast: d.contrast.into(),
            saturate: d.saturate.into(),
            sepia: d.sepia.into(),
            grayscale: d.grayscale.into(),
        }
    }
}

impl From<AdjustmentFields> for AdjustmentVector {
    fn from(f: AdjustmentFields) -> Self {
        let mut v = Self::DEFAULT;
        v.set(Channel::Brightness, f.brightness);
        v.set(Channel::Contrast, f.contrast);
        v.set(Channel::Saturate, f.saturate);
        v.set(Channel::Sepia, f.sepia);
        v.set(Channel::Grayscale, f.grayscale);
        v
    }
}

const fn clamp_to(value: u16, max: u16) -> u16 {
    if value > max { max } else { value }
}

impl AdjustmentVector {
    /// Neutral adjustments: the filter chain is an identity.
    pub const DEFAULT: Self = Self {
        brightness: 100,
        contrast: 100,
        saturate: 100,
        sepia: 0,
        grayscale: 0,
    };

    /// Build a vector, clamping each value to its channel range.
    #[must_use]
    pub const fn new(brightness: u16, contrast: u16, saturate: u16, sepia: u16, grayscale: u16) -> Self {
        Self {
            brightness: clamp_to(brightness, 200),
            contrast: clamp_to(contrast, 200),
            saturate: clamp_to(saturate, 200),
            sepia: clamp_to(sepia, 100),
            grayscale: clamp_to(grayscale, 100),
        }
    }

    /// Value of one channel.
    #[must_use]
    pub const fn get(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Brightness => self.brightness,
            Channel::Contrast => self.contrast,
            Channel::Saturate => self.saturate,
            Channel::Sepia => self.sepia,
            Channel::Grayscale => self.grayscale,
        }
    }

    /// Set one channel, clamping into `[0, channel.max()]`.
    pub fn set(&mut self, channel: Channel, value: i64) {
        let clamped = u16::try_from(value.clamp(0, i64::from(channel.max()))).unwrap_or(0);
        let slot = match channel {
            Channel::Brightness => &mut self.brightness,
            Channel::Contrast => &mut self.contrast,
            Channel::Saturate => &mut self.saturate,
            Channel::Sepia => &mut self.sepia,
            Channel::Grayscale => &mut self.grayscale,
        };
        *slot = clamped;
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, channel: Channel, value: i64) -> Self {
        self.set(channel, value);
        self
    }

    /// `true` when equal to [`DEFAULT`](Self::DEFAULT), i.e. "not editing".
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Typed filter chain for this vector, in the fixed channel order.
    #[must_use]
    pub fn filter_chain(&self) -> FilterChain {
        FilterChain(
            Channel::ALL
                .into_iter()
                .map(|c| FilterFn::new(c, f64::from(self.get(c))))
                .collect(),
        )
    }
}

impl Default for AdjustmentVector {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// CSS filter string for `vector`, e.g.
/// `"brightness(100%) contrast(100%) saturate(100%) sepia(0%) grayscale(0%)"`.
#[must_use]
pub fn generate_filter_expression(vector: &AdjustmentVector) -> String {
    vector.filter_chain().to_string()
}

/// A single filter primitive with its amount in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterFn {
    pub channel: Channel,
    pub percent: f64,
}

impl FilterFn {
    #[must_use]
    pub const fn new(channel: Channel, percent: f64) -> Self {
        Self { channel, percent }
    }

    /// `true` if this primitive leaves every pixel unchanged.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        self.percent == f64::from(self.channel.neutral())
            || (matches!(self.channel, Channel::Sepia | Channel::Grayscale) && self.percent <= 0.0)
    }

    /// Transform one straight-alpha sRGB triple in `[0, 1]`.
    #[allow(clippy::many_single_char_names)]
    fn apply(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        #[allow(clippy::cast_possible_truncation)]
        let a = (self.percent / 100.0).max(0.0) as f32;
        let out = match self.channel {
            Channel::Brightness => [r * a, g * a, b * a],
            Channel::Contrast => {
                let c = |v: f32| (v - 0.5).mul_add(a, 0.5);
                [c(r), c(g), c(b)]
            }
            Channel::Saturate => matrix(
                [
                    [0.787f32.mul_add(a, 0.213), 0.715 - 0.715 * a, 0.072 - 0.072 * a],
                    [0.213 - 0.213 * a, 0.285f32.mul_add(a, 0.715), 0.072 - 0.072 * a],
                    [0.213 - 0.213 * a, 0.715 - 0.715 * a, 0.928f32.mul_add(a, 0.072)],
                ],
                [r, g, b],
            ),
            Channel::Sepia => {
                let k = 1.0 - a.min(1.0);
                matrix(
                    [
                        [0.607f32.mul_add(k, 0.393), 0.769 - 0.769 * k, 0.189 - 0.189 * k],
                        [0.349 - 0.349 * k, 0.314f32.mul_add(k, 0.686), 0.168 - 0.168 * k],
                        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.869f32.mul_add(k, 0.131)],
                    ],
                    [r, g, b],
                )
            }
            Channel::Grayscale => {
                let k = 1.0 - a.min(1.0);
                matrix(
                    [
                        [0.7874f32.mul_add(k, 0.2126), 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
                        [0.2126 - 0.2126 * k, 0.2848f32.mul_add(k, 0.7152), 0.0722 - 0.0722 * k],
                        [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.9278f32.mul_add(k, 0.0722)],
                    ],
                    [r, g, b],
                )
            }
        };
        out.map(|v| v.clamp(0.0, 1.0))
    }
}

fn matrix(m: [[f32; 3]; 3], [r, g, b]: [f32; 3]) -> [f32; 3] {
    m.map(|row| row[2].mul_add(b, row[0].mul_add(r, row[1] * g)))
}

impl fmt::Display for FilterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}%)", self.channel, self.percent)
    }
}

/// Failure to parse a CSS filter string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    #[error("unknown filter function: {0:?}")]
    UnknownFunction(String),

    #[error("malformed filter function: {0:?}")]
    Malformed(String),

    #[error("invalid filter amount: {0:?}")]
    InvalidAmount(String),
}

/// An ordered sequence of filter primitives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterChain(Vec<FilterFn>);

impl FilterChain {
    #[must_use]
    pub const fn new(fns: Vec<FilterFn>) -> Self {
        Self(fns)
    }

    #[must_use]
    pub fn functions(&self) -> &[FilterFn] {
        &self.0
    }

    /// `true` if applying the chain cannot change any pixel.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.iter().all(FilterFn::is_identity)
    }

    /// Apply the chain to every pixel in place.
    pub fn apply_to_rgba(&self, image: &mut RgbaImage) {
        let active: Vec<FilterFn> = self.0.iter().copied().filter(|f| !f.is_identity()).collect();
        if active.is_empty() {
            return;
        }
        for px in image.pixels_mut() {
            let [r, g, b, _] = px.0;
            let mut rgb = [r, g, b].map(|v| f32::from(v) / 255.0);
            for f in &active {
                rgb = f.apply(rgb);
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let [r, g, b] = rgb.map(|v| (v * 255.0).round() as u8);
            px.0[0] = r;
            px.0[1] = g;
            px.0[2] = b;
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

impl FromStr for FilterChain {
    type Err = FilterParseError;

    /// Parse a CSS `filter` value made of the five supported functions.
    ///
    /// Amounts may be percentages (`120%`) or plain numbers (`1.2`).
    /// `none` and the empty string parse to an empty chain.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        if rest.is_empty() || rest.eq_ignore_ascii_case("none") {
            return Ok(Self::default());
        }
        let mut fns = Vec::new();
        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| FilterParseError::Malformed(rest.to_owned()))?;
            let close = rest
                .find(')')
                .filter(|&c| c > open)
                .ok_or_else(|| FilterParseError::Malformed(rest.to_owned()))?;
            let channel: Channel = rest[..open].parse()?;
            let arg = rest[open + 1..close].trim();
            let percent = match arg.strip_suffix('%') {
                Some(p) => p.trim().parse::<f64>(),
                None => arg.parse::<f64>().map(|v| v * 100.0),
            }
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| FilterParseError::InvalidAmount(arg.to_owned()))?;
            fns.push(FilterFn::new(channel, percent));
            rest = rest[close + 1..].trim_start();
        }
        Ok(Self(fns))
    }
}

/// A named adjustment preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub adjustments: AdjustmentVector,
}

/// The built-in preset catalog.
pub static PRESETS: [Preset; 5] = [
    Preset {
        name: "Vintage",
        adjustments: AdjustmentVector::new(110, 90, 120, 60, 0),
    },
    Preset {
        name: "Black & White",
        adjustments: AdjustmentVector::new(100, 110, 0, 0, 100),
    },
    Preset {
        name: "Cinematic",
        adjustments: AdjustmentVector::new(95, 120, 110, 10, 0),
    },
    Preset {
        name: "Summer",
        adjustments: AdjustmentVector::new(105, 105, 130, 0, 0),
    },
    Preset {
        name: "Cool",
        adjustments: AdjustmentVector::new(105, 110, 90, 0, 0),
    },
];

impl Preset {
    /// Look a preset up by display name or slug (`black-and-white`),
    /// ignoring case.
    #[must_use]
    pub fn find(name: &str) -> Option<&'static Self> {
        let wanted = slug(name);
        PRESETS.iter().find(|p| slug(p.name) == wanted)
    }

    /// The preset whose adjustments equal `vector`, if any.
    #[must_use]
    pub fn matching(vector: &AdjustmentVector) -> Option<&'static Self> {
        PRESETS.iter().find(|p| p.adjustments == *vector)
    }

    /// Lowercase, dash-separated identifier.
    #[must_use]
    pub fn slug(&self) -> String {
        slug(self.name)
    }
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase()
        .replace('&', "and")
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample_image() -> RgbaImage {
        RgbaImage::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, (255 - x * 3) as u8])
        })
    }

    #[test]
    fn default_expression() {
        assert_eq!(
            generate_filter_expression(&AdjustmentVector::default()),
            "brightness(100%) contrast(100%) saturate(100%) sepia(0%) grayscale(0%)"
        );
    }

    #[test]
    fn expression_uses_fixed_order() {
        let v = AdjustmentVector::DEFAULT
            .with(Channel::Grayscale, 40)
            .with(Channel::Brightness, 150);
        assert_eq!(
            generate_filter_expression(&v),
            "brightness(150%) contrast(100%) saturate(100%) sepia(0%) grayscale(40%)"
        );
    }

    #[test]
    fn set_clamps_to_channel_range() {
        let mut v = AdjustmentVector::default();
        v.set(Channel::Brightness, 999);
        v.set(Channel::Sepia, 150);
        v.set(Channel::Contrast, -20);
        assert_eq!(v.get(Channel::Brightness), 200);
        assert_eq!(v.get(Channel::Sepia), 100);
        assert_eq!(v.get(Channel::Contrast), 0);
    }

    #[test]
    fn deserialize_clamps_and_fills_defaults() {
        let v: AdjustmentVector = serde_json::from_str(r#"{"saturate": 500, "grayscale": 30}"#).unwrap();
        assert_eq!(v, AdjustmentVector::new(100, 100, 200, 0, 30));
    }

    #[test]
    fn default_chain_is_exact_identity() {
        let original = sample_image();
        let mut img = original.clone();
        AdjustmentVector::default().filter_chain().apply_to_rgba(&mut img);
        assert_eq!(img, original);
    }

    #[test]
    fn neutral_math_is_identity_without_shortcut() {
        // Run neutral primitives through the arithmetic path directly.
        let fns = [
            FilterFn::new(Channel::Saturate, 100.0),
            FilterFn::new(Channel::Contrast, 100.0),
            FilterFn::new(Channel::Brightness, 100.0),
        ];
        for px in sample_image().pixels() {
            let [r, g, b, _] = px.0;
            let mut rgb = [r, g, b].map(|v| f32::from(v) / 255.0);
            for f in &fns {
                rgb = f.apply(rgb);
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let out = rgb.map(|v| (v * 255.0).round() as u8);
            assert_eq!(out, [r, g, b]);
        }
    }

    #[test]
    fn brightness_zero_is_black_and_keeps_alpha() {
        let mut img = sample_image();
        AdjustmentVector::DEFAULT
            .with(Channel::Brightness, 0)
            .filter_chain()
            .apply_to_rgba(&mut img);
        for (x, _, px) in img.enumerate_pixels() {
            assert_eq!(&px.0[..3], &[0, 0, 0]);
            #[allow(clippy::cast_possible_truncation)]
            let alpha = (255 - x * 3) as u8;
            assert_eq!(px.0[3], alpha);
        }
    }

    #[test]
    fn full_grayscale_equalizes_channels() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([200, 40, 90, 255]));
        AdjustmentVector::DEFAULT
            .with(Channel::Grayscale, 100)
            .filter_chain()
            .apply_to_rgba(&mut img);
        let px = img.get_pixel(0, 0).0;
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        // 0.2126*200 + 0.7152*40 + 0.0722*90 = 77.6
        assert_eq!(px[0], 78);
    }

    #[test]
    fn brightness_clamps_before_contrast() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([200, 200, 200, 255]));
        FilterChain::new(vec![
            FilterFn::new(Channel::Brightness, 200.0),
            FilterFn::new(Channel::Contrast, 50.0),
        ])
        .apply_to_rgba(&mut img);
        // 200/255 * 2 clamps to 1.0, then (1.0 - 0.5) * 0.5 + 0.5 = 0.75.
        assert_eq!(img.get_pixel(0, 0).0, [191, 191, 191, 255]);
    }

    #[test]
    fn parse_round_trips_generated_expression() {
        let v = Preset::find("cinematic").unwrap().adjustments;
        let text = generate_filter_expression(&v);
        let chain: FilterChain = text.parse().unwrap();
        assert_eq!(chain, v.filter_chain());
    }

    #[test]
    fn parse_accepts_fractions_and_none() {
        let chain: FilterChain = "contrast(1.5) sepia( 30% )".parse().unwrap();
        assert_eq!(
            chain.functions(),
            &[
                FilterFn::new(Channel::Contrast, 150.0),
                FilterFn::new(Channel::Sepia, 30.0)
            ]
        );
        assert!("none".parse::<FilterChain>().unwrap().is_identity());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "blur(4px)".parse::<FilterChain>(),
            Err(FilterParseError::UnknownFunction(_))
        ));
        assert!(matches!(
            "brightness(abc)".parse::<FilterChain>(),
            Err(FilterParseError::InvalidAmount(_))
        ));
        assert!(matches!(
            "brightness(50%".parse::<FilterChain>(),
            Err(FilterParseError::Malformed(_))
        ));
    }

    #[test]
    fn preset_lookup() {
        let bw = Preset::find("Black & White").unwrap();
        assert_eq!(bw.slug(), "black-and-white");
        assert_eq!(Preset::find("black-and-white"), Some(bw));
        assert_eq!(bw.adjustments, AdjustmentVector::new(100, 110, 0, 0, 100));
        assert_eq!(Preset::matching(&bw.adjustments), Some(bw));
        assert!(Preset::find("sepia-dream").is_none());
        assert!(Preset::matching(&AdjustmentVector::DEFAULT).is_none());
    }
}
