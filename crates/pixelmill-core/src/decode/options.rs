//! Decode request options.

use serde::{Deserialize, Serialize};

use crate::common::{AllocatorKind, ColorSpace, PixelFormat, Rect, Size};

/// Default decimation factor: keep every pixel.
pub const DEFAULT_SAMPLE_SIZE: u32 = 1;

/// Caller-specified parameters controlling how encoded bytes become a
/// pixel buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingOptions {
    /// Density to fit the decoded buffer to. Zero leaves the decoded
    /// size untouched.
    pub fit_density: i32,
    /// Backing store hint for the destination buffer.
    pub allocator: AllocatorKind,
    /// Region of the source image to decode. The empty rect means the
    /// full image.
    pub desired_region: Rect,
    /// Output size. `(0, 0)` means the native size. When set, takes
    /// precedence over `sample_size`.
    pub desired_size: Size,
    /// Clockwise rotation in degrees, `[0, 360)`.
    pub rotate_degrees: f32,
    /// Decimation factor applied when no desired size is given. Must be
    /// at least 1.
    pub sample_size: u32,
    /// Destination format. `Unknown` lets the allocator policy decide.
    pub desired_pixel_format: PixelFormat,
    /// Color space hint for the decoded pixels.
    pub desired_color_space: ColorSpace,
    /// Whether a truncated body may still produce a partially decoded
    /// buffer instead of failing.
    pub allow_partial_image: bool,
    /// Whether the decoded buffer accepts writes.
    pub editable: bool,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            fit_density: 0,
            allocator: AllocatorKind::Default,
            desired_region: Rect::default(),
            desired_size: Size::default(),
            rotate_degrees: 0.0,
            sample_size: DEFAULT_SAMPLE_SIZE,
            desired_pixel_format: PixelFormat::Unknown,
            desired_color_space: ColorSpace::Srgb,
            allow_partial_image: true,
            editable: false,
        }
    }
}
