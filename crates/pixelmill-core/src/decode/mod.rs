//! Image decoding pipeline.
//!
//! This module provides:
//! - The decode request type ([`DecodingOptions`]) and its defaults
//! - The codec service boundary ([`Codec`]) and its registry-backed
//!   production implementation
//! - The decode event protocol (header / partial / complete)
//! - [`DecodePipeline`], which drives one-shot, streaming, and
//!   incremental decodes over any [`crate::source::SourceHandle`]
//!
//! # One-shot vs incremental
//!
//! The pipeline itself is stateless between calls: completeness lives on
//! the source handle. A decode over an incomplete incremental handle
//! either fails with a retryable incomplete error or, when the caller
//! allows partial images, produces a buffer with the decoded rows and
//! reports it through a `PartialDecoded` event. Feeding more bytes and
//! calling decode again is the retry path.

pub mod codec;
pub mod events;
mod options;
mod pipeline;

pub use codec::{supported_formats, Codec, FramePixels, ProbedImage, RegistryCodec};
pub use events::{DecodeControl, DecodeEvent, DecodeObserver, ObserverToken};
pub use options::{DecodingOptions, DEFAULT_SAMPLE_SIZE};
pub use pipeline::{DecodePipeline, SourceInfo};
