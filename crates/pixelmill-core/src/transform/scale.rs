//! Scaling math and pixel-format conversion helpers.
//!
//! The working representation for all geometric operations is RGBA-8888
//! (`image::RgbaImage`); buffers convert in and out of it around crops,
//! rotations, and resizes.

use image::RgbaImage;

use crate::common::{encode_color, PixelFormat, Rect, Size};
use crate::error::{ImageError, Result};
use crate::pixel::PixelBuffer;

/// Interpolation filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality).
    Nearest,
    /// Bilinear (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Compute the centered sub-rect of `source` whose aspect ratio matches
/// `target`, for center-crop scaling.
///
/// The relatively larger source dimension is trimmed symmetrically; the
/// result always fits inside `source` and never collapses below 1x1.
pub fn center_crop_region(source: Size, target: Size) -> Rect {
    let src_w = source.width as i64;
    let src_h = source.height as i64;
    let tgt_w = target.width as i64;
    let tgt_h = target.height as i64;

    // Compare aspect ratios without dividing: src wider than target
    // exactly when src_w * tgt_h > src_h * tgt_w.
    if src_w * tgt_h > src_h * tgt_w {
        let crop_w = ((src_h * tgt_w + tgt_h / 2) / tgt_h).clamp(1, src_w) as i32;
        Rect::new((source.width - crop_w) / 2, 0, crop_w, source.height)
    } else {
        let crop_h = ((src_w * tgt_h + tgt_w / 2) / tgt_w).clamp(1, src_h) as i32;
        Rect::new(0, (source.height - crop_h) / 2, source.width, crop_h)
    }
}

/// Copy a region of `buffer` into a new RGBA working image.
pub(crate) fn buffer_region_to_rgba(buffer: &PixelBuffer, region: Rect) -> Result<RgbaImage> {
    let mut words = vec![0u32; (region.width as usize) * (region.height as usize)];
    buffer.read_pixels(&mut words, 0, region.width as usize, region)?;

    let mut rgba = Vec::with_capacity(words.len() * 4);
    for argb in words {
        rgba.push((argb >> 16) as u8);
        rgba.push((argb >> 8) as u8);
        rgba.push(argb as u8);
        rgba.push((argb >> 24) as u8);
    }
    RgbaImage::from_raw(region.width as u32, region.height as u32, rgba)
        .ok_or_else(|| ImageError::IllegalState("region to RGBA conversion failed".to_string()))
}

/// Convert an RGBA working image into storage bytes for `format`.
pub(crate) fn rgba_to_pixel_bytes(img: &RgbaImage, format: PixelFormat) -> Result<Vec<u8>> {
    let bpp = format.bytes_per_pixel();
    let mut out = Vec::with_capacity(img.width() as usize * img.height() as usize * bpp);
    let mut encoded = [0u8; 4];
    for pixel in img.pixels() {
        let [r, g, b, a] = pixel.0;
        let argb = ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
        let n = encode_color(format, argb, &mut encoded)?;
        out.extend_from_slice(&encoded[..n]);
    }
    Ok(out)
}

/// Resize to exact dimensions, skipping the copy when nothing changes.
pub(crate) fn resize_exact(img: RgbaImage, target: Size, filter: FilterType) -> RgbaImage {
    if img.width() == target.width as u32 && img.height() == target.height as u32 {
        return img;
    }
    image::imageops::resize(
        &img,
        target.width as u32,
        target.height as u32,
        filter.to_image_filter(),
    )
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn size_strategy() -> impl Strategy<Value = Size> {
        (1i32..=2_000, 1i32..=2_000).prop_map(|(w, h)| Size::new(w, h))
    }

    proptest! {
        /// Property: the center-crop region always fits the source and
        /// never collapses to zero.
        #[test]
        fn prop_center_crop_fits_source(
            source in size_strategy(),
            target in size_strategy(),
        ) {
            let crop = center_crop_region(source, target);
            prop_assert!(crop.width >= 1);
            prop_assert!(crop.height >= 1);
            prop_assert!(crop.fits_within(source), "{crop:?} vs {source:?}");
        }

        /// Property: cropping keeps one full source dimension -- only
        /// the relatively larger one is trimmed.
        #[test]
        fn prop_center_crop_trims_one_dimension(
            source in size_strategy(),
            target in size_strategy(),
        ) {
            let crop = center_crop_region(source, target);
            prop_assert!(
                crop.width == source.width || crop.height == source.height
            );
        }
    }
}
