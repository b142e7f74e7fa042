//! Shared value types used across the runtime.
//!
//! Everything here is a plain data carrier: geometry, pixel format tags,
//! density math, and the static image description. Behavior lives in the
//! `pixel`, `decode`, and `transform` modules.

mod density;
mod format;
mod geometry;

pub use density::{fit_density_size, DisplayDensityConfig, DENSITY_DEFAULT, DENSITY_NONE};
pub use format::{decode_color, encode_color, AlphaType, ColorSpace, PixelFormat};
pub use geometry::{Position, Rect, Size, MAX_DIMENSION};

use serde::{Deserialize, Serialize};

/// Static description of a decodable image or pixel buffer.
///
/// The size stays `(0, 0)` until at least the header of the encoded
/// stream has been decoded successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub size: Size,
    pub pixel_format: PixelFormat,
    pub alpha_type: AlphaType,
}

impl ImageInfo {
    pub fn new(size: Size, pixel_format: PixelFormat, alpha_type: AlphaType) -> Self {
        Self {
            size,
            pixel_format,
            alpha_type,
        }
    }
}

/// Policy for reconciling source and target aspect ratios when deriving
/// a buffer at a new size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Output equals the target size exactly; non-uniform scale allowed.
    #[default]
    FitTargetSize,
    /// Output equals the target size exactly; the relatively larger
    /// source dimension is center-cropped first so nothing letterboxes.
    CenterCrop,
}

/// Caller hint for which backing store should hold pixel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocatorKind {
    /// Let the policy pick.
    #[default]
    Default,
    Heap,
    SharedMemory,
}

/// Memory pressure signal consulted while sizing a decode destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemoryUsagePreference {
    #[default]
    Default,
    /// Prefer halving footprint over color fidelity where alpha allows.
    LowRam,
}
