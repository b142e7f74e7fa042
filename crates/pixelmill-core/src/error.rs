//! Error taxonomy for the image runtime.

use thiserror::Error;

/// Error types shared by all image runtime operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Caller input was null-like, negative, or otherwise out of range.
    /// Never retryable; the call site must be fixed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Offset/length/region arithmetic violated the bounds of a buffer.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Operation on a released resource, or on a handle whose origin
    /// cannot support the requested operation.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The decoder needs more bytes. Retryable by feeding more data
    /// through `update_data`.
    #[error("Image data incomplete: {0}")]
    DataIncomplete(String),

    /// The encoded bytes are structurally invalid. Not retryable with
    /// the same input.
    #[error("Image data malformed: {0}")]
    DataMalformed(String),

    /// A well-formed request the image genuinely cannot satisfy,
    /// e.g. no embedded thumbnail.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Origin access failure, e.g. an unreadable path or a
    /// write-protected file during a metadata apply.
    #[error("I/O failure: {0}")]
    Io(String),
}

impl ImageError {
    /// True when feeding more bytes can turn this failure into a success.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImageError::DataIncomplete(_))
    }
}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Io(err.to_string())
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, ImageError>;
