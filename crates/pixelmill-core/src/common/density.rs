//! Display density configuration and density-fit arithmetic.

use serde::{Deserialize, Serialize};

use super::geometry::Size;

/// Density value meaning "no density information".
pub const DENSITY_NONE: i32 = 0;

/// Baseline display density (dots per inch) used when nothing better
/// is configured.
pub const DENSITY_DEFAULT: i32 = 160;

/// Explicit density configuration handed to the decode pipeline.
///
/// The default base density is stamped onto decoded buffers whose
/// source options carry no density of their own. There are no hidden
/// process-global lookups; callers that care pass their own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDensityConfig {
    pub default_base_density: i32,
}

impl Default for DisplayDensityConfig {
    fn default() -> Self {
        Self {
            default_base_density: DENSITY_DEFAULT,
        }
    }
}

/// Rescale `size` from `base_density` to `target_density`.
///
/// Each dimension is scaled as `(dim * target + base / 2) / base`, which
/// rounds to nearest with a half-up bias. When either density is
/// [`DENSITY_NONE`] or both are equal, the size is returned unchanged.
pub fn fit_density_size(size: Size, base_density: i32, target_density: i32) -> Size {
    if base_density == DENSITY_NONE || target_density == DENSITY_NONE || base_density == target_density {
        return size;
    }
    let scale = |dim: i32| -> i32 {
        let scaled = (dim as i64 * target_density as i64 + (base_density as i64 >> 1)) / base_density as i64;
        scaled.clamp(0, i32::MAX as i64) as i32
    };
    Size::new(scale(size.width), scale(size.height))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
