//! Geometry value types: sizes, positions, and pixel regions.

use serde::{Deserialize, Serialize};

/// Largest width or height any buffer or region may have.
pub const MAX_DIMENSION: i32 = i32::MAX >> 2;

/// Width and height of an image or buffer, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A `(0, 0)` size means "unspecified" in decode and transform
    /// requests: use the native size instead.
    pub fn is_empty(self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// True when both dimensions are positive and within range.
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0 && self.width <= MAX_DIMENSION && self.height <= MAX_DIMENSION
    }

    /// Total pixel count. Saturates rather than wrapping on overflow.
    pub fn pixel_count(self) -> u64 {
        (self.width.max(0) as u64).saturating_mul(self.height.max(0) as u64)
    }
}

/// A pixel coordinate, measured from the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True when the coordinate is non-negative and within range.
    pub fn is_valid(self) -> bool {
        self.x >= 0 && self.y >= 0 && self.x <= MAX_DIMENSION && self.y <= MAX_DIMENSION
    }
}

/// A rectangular pixel region: top-left corner plus extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: i32,
    pub min_y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(min_x: i32, min_y: i32, width: i32, height: i32) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// The all-zero rect means "unspecified": decode and transform
    /// requests treat it as the full image.
    pub fn is_empty(self) -> bool {
        self.min_x == 0 && self.min_y == 0 && self.width == 0 && self.height == 0
    }

    /// Full-image rect for a given size.
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True when this rect lies entirely inside an image of `bounds` size.
    pub fn fits_within(self, bounds: Size) -> bool {
        self.min_x >= 0
            && self.min_y >= 0
            && self.width > 0
            && self.height > 0
            && self.min_x.checked_add(self.width).is_some_and(|r| r <= bounds.width)
            && self.min_y.checked_add(self.height).is_some_and(|b| b <= bounds.height)
    }
}
