//! Pixel buffer ownership, addressing, and transport.

mod buffer;
pub mod parcel;

pub use buffer::{InitializationOptions, PixelBuffer};
pub use parcel::Parcel;
