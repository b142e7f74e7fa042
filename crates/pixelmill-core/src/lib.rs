//! Pixelmill Core - Image runtime library
//!
//! This crate turns encoded image bytes (PNG/JPEG/WebP/GIF/BMP/RAW) into
//! addressable pixel buffers, derives new buffers from existing ones
//! (crop/scale/format conversion), and batches transactional edits to an
//! image's embedded Exif metadata.
//!
//! # Architecture
//!
//! - [`source`] -- where encoded bytes come from: buffers, readers,
//!   paths, files, or an append-only incremental feed
//! - [`decode`] -- the decode pipeline, its options and event protocol,
//!   and the codec service boundary
//! - [`alloc`] -- backing-store and format selection under memory
//!   pressure
//! - [`pixel`] -- the pixel buffer itself plus its transport encoding
//! - [`transform`] -- deriving buffers: regions, scale modes, rotation
//! - [`exif`] -- metadata reads and the batched property editor
//!
//! Everything is synchronous and runs on the caller's thread; decode
//! events fire inside the decode call. The crate holds no locks and no
//! global state -- density configuration is passed in explicitly.

pub mod alloc;
pub mod common;
pub mod decode;
pub mod error;
pub mod exif;
pub mod pixel;
pub mod source;
pub mod transform;

pub use alloc::{AllocatorPolicy, BackingStore, Selection};
pub use common::{
    AllocatorKind, AlphaType, ColorSpace, DisplayDensityConfig, ImageInfo, MemoryUsagePreference,
    PixelFormat, Position, Rect, ScaleMode, Size,
};
pub use decode::{
    supported_formats, DecodeEvent, DecodeObserver, DecodePipeline, DecodingOptions, SourceInfo,
};
pub use error::{ImageError, Result};
pub use exif::{ApplyOutcome, ExifPropertyEditor, MetadataStore};
pub use pixel::{InitializationOptions, PixelBuffer};
pub use source::{IncrementalSourceOptions, SourceHandle, SourceOptions, UpdateMode};
pub use transform::{Derived, TransformPlanner, TransformRequest};
