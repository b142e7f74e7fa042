//! Deriving buffers: region selection, scaling, rotation, format change.
//!
//! # Operation Order
//!
//! A derivation always applies its steps in the same order regardless of
//! how the request was built:
//! 1. Region crop
//! 2. Aspect reconciliation (center-crop, when requested)
//! 3. Scale to target size
//! 4. Pixel format / alpha conversion
//!
//! Rotation is a decode-time operation and lives in [`rotate`]; the
//! decode pipeline slots it between decimation and final scaling.

mod planner;
mod rotate;
mod scale;

pub use planner::{Derived, TransformPlanner, TransformRequest};
pub use rotate::{compute_rotated_bounds, rotate_rgba};
pub use scale::{center_crop_region, FilterType};

pub(crate) use scale::{resize_exact, rgba_to_pixel_bytes};
