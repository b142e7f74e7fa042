//! Deriving new pixel buffers from existing ones.
//!
//! The planner composes region selection, aspect reconciliation, scaling,
//! and format conversion into one derivation step. Its one aliasing rule:
//! when the caller opts in with `use_source_if_match` and the computed
//! output is geometrically and format-wise identical to the source, the
//! source itself is the result and no new memory is allocated.

use crate::common::{AlphaType, ImageInfo, PixelFormat, Rect, ScaleMode, Size};
use crate::error::{ImageError, Result};
use crate::pixel::PixelBuffer;

use super::scale::{
    buffer_region_to_rgba, center_crop_region, resize_exact, rgba_to_pixel_bytes, FilterType,
};

/// Parameters for deriving a buffer from a source buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformRequest {
    /// Output size. Empty means the source's size.
    pub size: Size,
    /// Aspect reconciliation policy when source and target differ.
    pub scale_mode: ScaleMode,
    /// Output format. `Unknown` inherits the source's.
    pub pixel_format: PixelFormat,
    /// Output alpha interpretation. `Unknown` inherits the source's.
    pub alpha_type: AlphaType,
    /// Whether the derived buffer accepts writes.
    pub editable: bool,
    /// Return the source itself when the output would be identical.
    pub use_source_if_match: bool,
    /// Release the source after producing a distinct derived buffer.
    pub release_source: bool,
}

/// Result of a derivation.
#[derive(Debug)]
pub enum Derived {
    /// The source already matches the request; it is the result. No new
    /// buffer exists, so releasing "the result" means releasing the
    /// source.
    Source,
    /// A freshly allocated buffer.
    New(PixelBuffer),
}

/// Plans and executes buffer derivations.
#[derive(Debug, Clone, Default)]
pub struct TransformPlanner {
    filter: FilterType,
}

impl TransformPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Derive a buffer from `source` over `src_region`.
    ///
    /// An empty `src_region` selects the whole source; an empty request
    /// size keeps the source's size. A region that does not lie inside
    /// the source bounds yields `Ok(None)` -- the operation cannot be
    /// satisfied, but it is not a caller error.
    pub fn derive(
        &self,
        source: &mut PixelBuffer,
        src_region: Rect,
        request: &TransformRequest,
    ) -> Result<Option<Derived>> {
        if source.is_released() {
            return Err(ImageError::IllegalState(
                "derive from a released pixel buffer".to_string(),
            ));
        }
        let source_info = source.image_info();
        let region = if src_region.is_empty() {
            Rect::full(source_info.size)
        } else {
            src_region
        };
        if !region.fits_within(source_info.size) {
            log::debug!(
                "derive region ({}, {}, {}, {}) outside {}x{} source",
                region.min_x,
                region.min_y,
                region.width,
                region.height,
                source_info.size.width,
                source_info.size.height
            );
            return Ok(None);
        }

        let target_size = if request.size.is_empty() {
            source_info.size
        } else {
            request.size
        };
        if !target_size.is_valid() {
            return Err(ImageError::InvalidArgument(format!(
                "target size {}x{} is invalid",
                target_size.width, target_size.height
            )));
        }
        let target_format = if request.pixel_format == PixelFormat::Unknown {
            source_info.pixel_format
        } else {
            request.pixel_format
        };
        let target_alpha = if request.alpha_type == AlphaType::Unknown {
            source_info.alpha_type
        } else {
            request.alpha_type
        };

        if request.use_source_if_match
            && region == Rect::full(source_info.size)
            && target_size == source_info.size
            && target_format == source_info.pixel_format
            && target_alpha == source_info.alpha_type
        {
            return Ok(Some(Derived::Source));
        }

        let content = buffer_region_to_rgba(source, region)?;
        let scaled = match request.scale_mode {
            ScaleMode::FitTargetSize => resize_exact(content, target_size, self.filter),
            ScaleMode::CenterCrop => {
                let crop = center_crop_region(region.size(), target_size);
                let cropped = image::imageops::crop_imm(
                    &content,
                    crop.min_x as u32,
                    crop.min_y as u32,
                    crop.width as u32,
                    crop.height as u32,
                )
                .to_image();
                resize_exact(cropped, target_size, self.filter)
            }
        };

        let bytes = rgba_to_pixel_bytes(&scaled, target_format)?;
        let derived = PixelBuffer::from_parts(
            ImageInfo::new(target_size, target_format, target_alpha),
            bytes,
            request.editable,
            source.base_density(),
            source.backing_store(),
        );

        if request.release_source {
            source.release();
        }
        Ok(Some(Derived::New(derived)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Position;
    use crate::pixel::InitializationOptions;

    fn filled_buffer(width: i32, height: i32, color: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::create(&InitializationOptions {
            size: Size::new(width, height),
            pixel_format: PixelFormat::Argb8888,
            editable: true,
            ..Default::default()
        })
        .unwrap();
        buffer.fill(color).unwrap();
        buffer
    }

    #[test]
    fn test_matching_request_returns_source_instance() {
        let mut source = filled_buffer(4, 4, 0xFF336699);
        let request = TransformRequest {
            use_source_if_match: true,
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        assert!(matches!(derived, Derived::Source));
        assert!(!source.is_released());
    }

    #[test]
    fn test_matching_geometry_without_opt_in_copies() {
        let mut source = filled_buffer(4, 4, 0xFF336699);
        let request = TransformRequest::default();
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        match derived {
            Derived::New(buffer) => assert!(buffer.is_same_image(&source)),
            Derived::Source => panic!("expected a copy without use_source_if_match"),
        }
    }

    #[test]
    fn test_region_outside_bounds_yields_none() {
        let mut source = filled_buffer(4, 4, 0xFF000000);
        let request = TransformRequest::default();
        let planner = TransformPlanner::new();

        let result = planner
            .derive(&mut source, Rect::new(2, 2, 4, 4), &request)
            .unwrap();
        assert!(result.is_none());

        let result = planner
            .derive(&mut source, Rect::new(-1, 0, 2, 2), &request)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_released_source_is_state_error() {
        let mut source = filled_buffer(2, 2, 0);
        source.release();
        let result =
            TransformPlanner::new().derive(&mut source, Rect::default(), &TransformRequest::default());
        assert!(matches!(result, Err(ImageError::IllegalState(_))));
    }

    #[test]
    fn test_fit_target_size_stretches() {
        let mut source = filled_buffer(4, 2, 0xFF804020);
        let request = TransformRequest {
            size: Size::new(2, 6),
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        let Derived::New(buffer) = derived else {
            panic!("expected a new buffer");
        };
        assert_eq!(buffer.image_info().size, Size::new(2, 6));
        assert_eq!(buffer.read_pixel(Position::new(1, 3)).unwrap(), 0xFF804020);
    }

    #[test]
    fn test_center_crop_exact_target_size() {
        // Left half red, right half green; square center-crop of the
        // wide source keeps the middle of both halves.
        let mut source = filled_buffer(8, 4, 0xFFFF0000);
        for y in 0..4 {
            for x in 4..8 {
                source.write_pixel(Position::new(x, y), 0xFF00FF00).unwrap();
            }
        }
        let request = TransformRequest {
            size: Size::new(4, 4),
            scale_mode: ScaleMode::CenterCrop,
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        let Derived::New(buffer) = derived else {
            panic!("expected a new buffer");
        };
        assert_eq!(buffer.image_info().size, Size::new(4, 4));
        // No letterboxing: corners are fully opaque content
        assert_eq!(buffer.read_pixel(Position::new(0, 0)).unwrap() >> 24, 0xFF);
        assert_eq!(buffer.read_pixel(Position::new(3, 3)).unwrap() >> 24, 0xFF);
    }

    #[test]
    fn test_format_override() {
        let mut source = filled_buffer(2, 2, 0xFFFFFFFF);
        let request = TransformRequest {
            pixel_format: PixelFormat::Rgb565,
            alpha_type: AlphaType::Opaque,
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        let Derived::New(buffer) = derived else {
            panic!("expected a new buffer");
        };
        let info = buffer.image_info();
        assert_eq!(info.pixel_format, PixelFormat::Rgb565);
        assert_eq!(info.alpha_type, AlphaType::Opaque);
        assert_eq!(buffer.read_pixel(Position::new(0, 0)).unwrap(), 0xFFFFFFFF);
    }

    #[test]
    fn test_release_source_after_distinct_derive() {
        let mut source = filled_buffer(4, 4, 0xFF112233);
        let request = TransformRequest {
            size: Size::new(2, 2),
            release_source: true,
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        assert!(matches!(derived, Derived::New(_)));
        assert!(source.is_released());
    }

    #[test]
    fn test_release_source_skipped_on_same_instance() {
        let mut source = filled_buffer(4, 4, 0xFF112233);
        let request = TransformRequest {
            use_source_if_match: true,
            release_source: true,
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::default(), &request)
            .unwrap()
            .expect("in bounds");
        assert!(matches!(derived, Derived::Source));
        assert!(!source.is_released());
    }

    #[test]
    fn test_region_crop_selects_content() {
        let mut source = filled_buffer(4, 4, 0xFF0000FF);
        source.write_pixel(Position::new(2, 2), 0xFFABCDEF).unwrap();
        let request = TransformRequest {
            size: Size::new(1, 1),
            ..Default::default()
        };
        let derived = TransformPlanner::new()
            .derive(&mut source, Rect::new(2, 2, 1, 1), &request)
            .unwrap()
            .expect("in bounds");
        let Derived::New(buffer) = derived else {
            panic!("expected a new buffer");
        };
        assert_eq!(buffer.read_pixel(Position::new(0, 0)).unwrap(), 0xFFABCDEF);
    }
}
