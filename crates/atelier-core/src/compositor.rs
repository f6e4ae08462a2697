//! Decode, redraw, and re-encode images.
//!
//! Every commit (filters, resize, mask export) goes through here: the
//! source payload is fully decoded, drawn into a fresh RGBA surface of the
//! target size with the filter chain applied, and encoded back to bytes.
//! Surfaces larger than the configured pixel budget are refused before any
//! allocation happens.

use std::io::Cursor;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbaImage,
};

use crate::adjust::FilterChain;
use crate::resample::ResampleFilter;
use crate::types::{Dimensions, RasterImage, StudioError};

/// Quality used for lossy JPEG output, matching the browser default of
/// `canvas.toDataURL("image/jpeg")`.
pub const JPEG_QUALITY: u8 = 92;

/// Decode a payload into pixels.
///
/// # Errors
///
/// Returns [`StudioError::EmptyInput`] if `bytes` is empty.
/// Returns [`StudioError::Decode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, StudioError> {
    if bytes.is_empty() {
        return Err(StudioError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Decode a payload and report its pixel dimensions.
///
/// # Errors
///
/// Same as [`decode`].
pub fn probe_dimensions(bytes: &[u8]) -> Result<Dimensions, StudioError> {
    let img = decode(bytes)?;
    Dimensions::new(img.width(), img.height()).map_err(|_| StudioError::Decode("image has zero area".into()))
}

/// Read a payload's dimensions from its header without decoding pixels.
///
/// # Errors
///
/// Same as [`decode`], for an unrecognized format or a corrupt header.
pub fn header_dimensions(bytes: &[u8]) -> Result<Dimensions, StudioError> {
    if bytes.is_empty() {
        return Err(StudioError::EmptyInput);
    }
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| StudioError::Decode(e.to_string()))?
        .into_dimensions()?;
    Dimensions::new(width, height).map_err(|_| StudioError::Decode("image has zero area".into()))
}

/// Guess a MIME type from the payload's magic bytes.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Refuse surfaces that exceed `max_pixels`.
///
/// # Errors
///
/// Returns [`StudioError::Compositor`] when the surface is too large.
pub fn check_surface(dims: Dimensions, max_pixels: u64) -> Result<(), StudioError> {
    if dims.pixel_count() > max_pixels {
        return Err(StudioError::Compositor(format!(
            "a {dims} surface exceeds the {max_pixels} pixel limit"
        )));
    }
    Ok(())
}

/// `true` when [`encode`] can produce `mime` itself rather than falling
/// back to PNG.
#[must_use]
pub fn can_encode(mime: &str) -> bool {
    matches!(
        ImageFormat::from_mime_type(mime),
        Some(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Bmp)
    )
}

/// Encode RGBA pixels as `mime`.
///
/// PNG, JPEG, WebP (lossless), and BMP are written natively; JPEG drops
/// the alpha channel. Any other MIME type is written as PNG. Returns the
/// bytes together with the MIME type actually produced.
///
/// # Errors
///
/// Returns [`StudioError::Compositor`] if the encoder fails.
pub fn encode(pixels: &RgbaImage, mime: &str) -> Result<(Vec<u8>, &'static str), StudioError> {
    let (w, h) = pixels.dimensions();
    let mut buf = Vec::new();
    let format = ImageFormat::from_mime_type(mime).filter(|_| can_encode(mime));
    let produced = match format {
        Some(ImageFormat::Jpeg) => {
            let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
                .write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map(|()| ImageFormat::Jpeg)
        }
        Some(ImageFormat::WebP) => WebPEncoder::new_lossless(&mut buf)
            .write_image(pixels.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map(|()| ImageFormat::WebP),
        Some(ImageFormat::Bmp) => BmpEncoder::new(&mut buf)
            .write_image(pixels.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map(|()| ImageFormat::Bmp),
        _ => PngEncoder::new(&mut buf)
            .write_image(pixels.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map(|()| ImageFormat::Png),
    }
    .map_err(|e| StudioError::Compositor(format!("failed to encode image: {e}")))?;
    Ok((buf, produced.to_mime_type()))
}

/// Encode RGBA pixels as PNG, whatever the source type.
///
/// # Errors
///
/// Returns [`StudioError::Compositor`] if the encoder fails.
pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, StudioError> {
    encode(pixels, "image/png").map(|(bytes, _)| bytes)
}

/// Wrap encoded pixels as a new [`RasterImage`] with known dimensions.
///
/// # Errors
///
/// Same as [`encode`].
pub fn to_raster(pixels: &RgbaImage, mime: &str) -> Result<RasterImage, StudioError> {
    let (bytes, produced) = encode(pixels, mime)?;
    let dims = Dimensions::new(pixels.width(), pixels.height())
        .map_err(|e| StudioError::Compositor(e.to_string()))?;
    Ok(RasterImage::new(bytes, produced).with_dimensions(dims))
}

/// Redraw `source` into a `target`-sized surface with `chain` applied and
/// encode it with the source's MIME type.
///
/// The filter runs after resampling, as a canvas applies `ctx.filter`
/// while drawing the scaled image.
///
/// # Errors
///
/// Returns [`StudioError::Compositor`] if the target surface exceeds
/// `max_pixels` or encoding fails, and the [`decode`] errors if the
/// source cannot be decoded.
pub fn rasterize(
    source: &RasterImage,
    target: Dimensions,
    chain: &FilterChain,
    filter: ResampleFilter,
    max_pixels: u64,
) -> Result<RasterImage, StudioError> {
    check_surface(target, max_pixels)?;
    let decoded = decode(source.bytes())?;
    let rgba = decoded.to_rgba8();
    let mut surface = if rgba.dimensions() == (target.width, target.height) {
        rgba
    } else {
        image::imageops::resize(&rgba, target.width, target.height, filter.to_image_filter())
    };
    chain.apply_to_rgba(&mut surface);
    to_raster(&surface, source.mime())
}

/// Read the pixels of a PNG (or any decodable) payload back as RGBA.
///
/// # Errors
///
/// Same as [`decode`].
pub fn read_rgba(bytes: &[u8]) -> Result<RgbaImage, StudioError> {
    decode(bytes).map(|img| img.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::adjust::{AdjustmentVector, Channel};
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 128, 255])
        })
    }

    fn png_raster(w: u32, h: u32) -> RasterImage {
        to_raster(&gradient(w, h), "image/png").unwrap()
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(decode(&[]).unwrap_err(), StudioError::EmptyInput);
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        assert!(matches!(decode(b"not an image").unwrap_err(), StudioError::Decode(_)));
    }

    #[test]
    fn header_dimensions_match_decode() {
        let raster = png_raster(37, 12);
        let header = header_dimensions(raster.bytes()).unwrap();
        assert_eq!(header, probe_dimensions(raster.bytes()).unwrap());
        assert_eq!(header.to_string(), "37x12");
        assert!(check_surface(header, 444).is_ok());
        assert!(matches!(
            check_surface(header, 443),
            Err(StudioError::Compositor(_))
        ));
        assert!(matches!(
            header_dimensions(b"not an image").unwrap_err(),
            StudioError::Decode(_)
        ));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let pixels = gradient(20, 10);
        let bytes = encode_png(&pixels).unwrap();
        assert_eq!(read_rgba(&bytes).unwrap(), pixels);
        assert_eq!(sniff_mime(&bytes), Some("image/png"));
    }

    #[test]
    fn jpeg_source_stays_jpeg() {
        let (bytes, mime) = encode(&gradient(16, 16), "image/jpeg").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(sniff_mime(&bytes), Some("image/jpeg"));
    }

    #[test]
    fn unknown_mime_falls_back_to_png() {
        let (bytes, mime) = encode(&gradient(4, 4), "image/x-unknown").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(sniff_mime(&bytes), Some("image/png"));
        assert!(!can_encode("image/gif"));
        assert!(can_encode("image/webp"));
    }

    #[test]
    fn rasterize_resizes_to_target() {
        let source = png_raster(400, 300);
        let target = Dimensions::new(800, 600).unwrap();
        let out = rasterize(
            &source,
            target,
            &FilterChain::default(),
            ResampleFilter::default(),
            u64::MAX,
        )
        .unwrap();
        assert_eq!(out.dimensions(), Some(target));
        assert_eq!(out.mime(), "image/png");
        assert_ne!(out.id(), source.id());
        assert_eq!(probe_dimensions(out.bytes()).unwrap(), target);
    }

    #[test]
    fn rasterize_identity_preserves_pixels() {
        let source = png_raster(32, 24);
        let out = rasterize(
            &source,
            source.dimensions().unwrap(),
            &AdjustmentVector::default().filter_chain(),
            ResampleFilter::default(),
            u64::MAX,
        )
        .unwrap();
        assert_eq!(read_rgba(out.bytes()).unwrap(), gradient(32, 24));
    }

    #[test]
    fn rasterize_applies_filters() {
        let source = png_raster(8, 8);
        let chain = AdjustmentVector::DEFAULT
            .with(Channel::Brightness, 0)
            .filter_chain();
        let out = rasterize(
            &source,
            source.dimensions().unwrap(),
            &chain,
            ResampleFilter::Nearest,
            u64::MAX,
        )
        .unwrap();
        let pixels = read_rgba(out.bytes()).unwrap();
        assert!(pixels.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn oversized_surface_is_refused() {
        let source = png_raster(4, 4);
        let err = rasterize(
            &source,
            Dimensions::new(100, 100).unwrap(),
            &FilterChain::default(),
            ResampleFilter::default(),
            9_999,
        )
        .unwrap_err();
        assert!(matches!(err, StudioError::Compositor(_)));
    }
}
