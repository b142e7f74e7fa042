//! Pixel format and alpha type tags, plus color word conversion.
//!
//! The external color word is always unpremultiplied ARGB-8888
//! (`0xAARRGGBB`), regardless of how a buffer stores its pixels.
//! Conversion to and from each storage format lives here so buffer,
//! decode, and transform code all agree on the byte layout.

use serde::{Deserialize, Serialize};

use crate::error::{ImageError, Result};

/// Storage format of a pixel buffer.
///
/// Tag values match the runtime's wire numbering and are stable: they
/// are what the transport parcel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    /// Format left unspecified; resolved by the allocator policy.
    #[default]
    Unknown = 0,
    /// 8 bits per channel, alpha first.
    Argb8888 = 1,
    /// 16-bit packed 5-6-5, no alpha channel.
    Rgb565 = 2,
    /// 8 bits per channel, alpha last.
    Rgba8888 = 3,
    /// 8 bits per channel, blue first, alpha last.
    Bgra8888 = 4,
    /// Single 8-bit alpha plane.
    Alpha8 = 6,
    /// Four-channel print format. Carried for transport fidelity only.
    Cmyk = 10,
}

impl PixelFormat {
    /// Bytes each pixel occupies in this format.
    ///
    /// `Unknown` reports 0 so callers cannot silently size a buffer for
    /// an unresolved format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::Alpha8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Argb8888 | PixelFormat::Rgba8888 | PixelFormat::Bgra8888 | PixelFormat::Cmyk => 4,
        }
    }

    /// True when this format carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Argb8888 | PixelFormat::Rgba8888 | PixelFormat::Bgra8888 | PixelFormat::Alpha8
        )
    }
}

impl From<u32> for PixelFormat {
    fn from(value: u32) -> Self {
        match value {
            1 => PixelFormat::Argb8888,
            2 => PixelFormat::Rgb565,
            3 => PixelFormat::Rgba8888,
            4 => PixelFormat::Bgra8888,
            6 => PixelFormat::Alpha8,
            10 => PixelFormat::Cmyk,
            _ => PixelFormat::Unknown,
        }
    }
}

/// How the alpha channel of a buffer is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum AlphaType {
    #[default]
    Unknown = 0,
    /// No meaningful alpha; every pixel is fully covered.
    Opaque = 1,
    /// Color channels are premultiplied by alpha.
    Premul = 2,
    /// Straight (unpremultiplied) alpha.
    Unpremul = 3,
}

impl From<u32> for AlphaType {
    fn from(value: u32) -> Self {
        match value {
            1 => AlphaType::Opaque,
            2 => AlphaType::Premul,
            3 => AlphaType::Unpremul,
            _ => AlphaType::Unknown,
        }
    }
}

/// Color space hint attached to decode requests.
///
/// Only sRGB is produced by the registry codec; the tag exists so the
/// request type can round-trip through serialization unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Srgb,
    LinearSrgb,
    DisplayP3,
}

/// Encode an unpremultiplied ARGB color word into `format` storage bytes.
///
/// Returns the number of bytes written into `out` (1, 2, or 4).
pub fn encode_color(format: PixelFormat, color: u32, out: &mut [u8; 4]) -> Result<usize> {
    let a = (color >> 24) as u8;
    let r = (color >> 16) as u8;
    let g = (color >> 8) as u8;
    let b = color as u8;
    match format {
        PixelFormat::Argb8888 => {
            *out = [a, r, g, b];
            Ok(4)
        }
        PixelFormat::Rgba8888 => {
            *out = [r, g, b, a];
            Ok(4)
        }
        PixelFormat::Bgra8888 => {
            *out = [b, g, r, a];
            Ok(4)
        }
        PixelFormat::Rgb565 => {
            let packed =
                (((r >> 3) as u16) << 11) | (((g >> 2) as u16) << 5) | ((b >> 3) as u16);
            out[0] = (packed & 0xFF) as u8;
            out[1] = (packed >> 8) as u8;
            Ok(2)
        }
        PixelFormat::Alpha8 => {
            out[0] = a;
            Ok(1)
        }
        PixelFormat::Cmyk | PixelFormat::Unknown => Err(ImageError::Unsupported(format!(
            "no color word conversion for {format:?}"
        ))),
    }
}

/// Decode `format` storage bytes back into an unpremultiplied ARGB word.
pub fn decode_color(format: PixelFormat, bytes: &[u8]) -> Result<u32> {
    match format {
        PixelFormat::Argb8888 => Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        PixelFormat::Rgba8888 => Ok(u32::from_be_bytes([bytes[3], bytes[0], bytes[1], bytes[2]])),
        PixelFormat::Bgra8888 => Ok(u32::from_be_bytes([bytes[3], bytes[2], bytes[1], bytes[0]])),
        PixelFormat::Rgb565 => {
            let packed = u16::from_le_bytes([bytes[0], bytes[1]]);
            // Expand 5/6-bit channels by bit replication so full
            // intensity maps back to 0xFF.
            let r5 = ((packed >> 11) & 0x1F) as u32;
            let g6 = ((packed >> 5) & 0x3F) as u32;
            let b5 = (packed & 0x1F) as u32;
            let r = (r5 << 3) | (r5 >> 2);
            let g = (g6 << 2) | (g6 >> 4);
            let b = (b5 << 3) | (b5 >> 2);
            Ok(0xFF00_0000 | (r << 16) | (g << 8) | b)
        }
        PixelFormat::Alpha8 => Ok((bytes[0] as u32) << 24),
        PixelFormat::Cmyk | PixelFormat::Unknown => Err(ImageError::Unsupported(format!(
            "no color word conversion for {format:?}"
        ))),
    }
}
