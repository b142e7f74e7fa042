//! Codec service boundary.
//!
//! The core never interprets compressed bytes itself: everything that
//! touches container internals goes through the [`Codec`] trait. The
//! production implementation, [`RegistryCodec`], drives the `image`
//! crate's decoders plus a TIFF-container walk for RAW files whose
//! preview is an embedded JPEG.

use std::io::Cursor;

use image::{AnimationDecoder, ImageReader};

use crate::common::Size;
use crate::error::{ImageError, Result};

/// Header-probe result: everything knowable without decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedImage {
    pub size: Size,
    /// MIME-style container name, e.g. `"image/png"`.
    pub container_format: String,
    /// Number of top-level frames (1 for still images).
    pub frame_count: usize,
    /// Whether the container can carry an alpha channel.
    pub has_alpha: bool,
}

/// One decoded frame in the RGBA-8888 working representation.
#[derive(Debug, Clone)]
pub struct FramePixels {
    pub size: Size,
    /// Row-major RGBA bytes, 4 per pixel, `size.height` rows.
    /// Rows past `rows_decoded` are zero-filled.
    pub rgba: Vec<u8>,
    /// Rows actually produced. Equals `size.height` for a full decode;
    /// less when the input was truncated mid-body.
    pub rows_decoded: i32,
}

impl FramePixels {
    pub fn is_complete(&self) -> bool {
        self.rows_decoded >= self.size.height
    }
}

/// External codec service.
///
/// `complete` tells the codec whether the bytes are known to be the
/// whole container; it decides between incomplete and malformed when
/// parsing fails.
pub trait Codec {
    /// Resolve header information from the bytes available so far.
    fn probe(&self, bytes: &[u8], complete: bool) -> Result<ProbedImage>;

    /// Decode frame `index` into RGBA pixels.
    fn decode_frame(&self, bytes: &[u8], complete: bool, index: usize) -> Result<FramePixels>;

    /// Extract embedded thumbnail bytes (an encoded JPEG), if present.
    fn extract_thumbnail(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Container names the registry codec can decode.
pub fn supported_formats() -> &'static [&'static str] {
    &[
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/bmp",
        "image/x-raw",
    ]
}

const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00]; // II + 42
const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A]; // MM + 42

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Codec backed by the `image` crate's decoder registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryCodec;

impl RegistryCodec {
    pub fn new() -> Self {
        Self
    }

    fn probe_raw(&self, bytes: &[u8], complete: bool) -> Result<ProbedImage> {
        let mut reader = std::io::BufReader::new(Cursor::new(bytes));
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| classify(complete, format!("RAW container: {e}")))?;

        let dim = |tag| {
            exif.get_field(tag, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        };
        match (dim(exif::Tag::ImageWidth), dim(exif::Tag::ImageLength)) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok(ProbedImage {
                size: Size::new(w as i32, h as i32),
                container_format: "image/x-raw".to_string(),
                frame_count: 1,
                has_alpha: false,
            }),
            _ => Err(classify(complete, "RAW header lacks dimensions".to_string())),
        }
    }

    fn decode_gif_frame(&self, bytes: &[u8], complete: bool, index: usize) -> Result<FramePixels> {
        let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(bytes))
            .map_err(|e| map_image_error(complete, e))?;
        let frame = decoder
            .into_frames()
            .nth(index)
            .ok_or_else(|| {
                ImageError::InvalidArgument(format!("frame index {index} out of range"))
            })?
            .map_err(|e| map_image_error(complete, e))?;
        Ok(frame_from_rgba(frame.into_buffer()))
    }
}

impl Codec for RegistryCodec {
    fn probe(&self, bytes: &[u8], complete: bool) -> Result<ProbedImage> {
        if bytes.is_empty() {
            return Err(ImageError::DataIncomplete("no bytes to probe".to_string()));
        }
        if bytes.len() >= 4 && (bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE) {
            return self.probe_raw(bytes, complete);
        }

        let format = image::guess_format(bytes).map_err(|_| {
            if complete {
                ImageError::DataMalformed("unrecognized container".to_string())
            } else {
                ImageError::DataIncomplete("container not identifiable yet".to_string())
            }
        })?;

        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| map_image_error(complete, e))?;

        let frame_count = if format == image::ImageFormat::Gif {
            count_gif_frames(bytes)
        } else {
            1
        };

        Ok(ProbedImage {
            size: Size::new(width as i32, height as i32),
            container_format: format.to_mime_type().to_string(),
            frame_count,
            has_alpha: !matches!(format, image::ImageFormat::Jpeg | image::ImageFormat::Bmp),
        })
    }

    fn decode_frame(&self, bytes: &[u8], complete: bool, index: usize) -> Result<FramePixels> {
        if bytes.is_empty() {
            return Err(ImageError::DataIncomplete("no bytes to decode".to_string()));
        }
        if bytes.len() >= 4 && (bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE) {
            // RAW sensor decode is out of reach; the embedded preview is
            // the decodable payload.
            if index != 0 {
                return Err(ImageError::InvalidArgument(format!(
                    "frame index {index} out of range for RAW"
                )));
            }
            let jpeg = self.extract_thumbnail(bytes)?;
            return self.decode_frame(&jpeg, true, 0);
        }

        let format = image::guess_format(bytes).map_err(|_| {
            if complete {
                ImageError::DataMalformed("unrecognized container".to_string())
            } else {
                ImageError::DataIncomplete("container not identifiable yet".to_string())
            }
        })?;

        if format == image::ImageFormat::Gif {
            return self.decode_gif_frame(bytes, complete, index);
        }
        if index != 0 {
            return Err(ImageError::InvalidArgument(format!(
                "frame index {index} out of range for single-frame {format:?}"
            )));
        }

        let img = ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map_err(|e| map_image_error(complete, e))?;
        Ok(frame_from_rgba(img.into_rgba8()))
    }

    fn extract_thumbnail(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        scan_for_embedded_jpeg(bytes)
            .ok_or_else(|| ImageError::Unsupported("no embedded thumbnail".to_string()))
    }
}

fn frame_from_rgba(img: image::RgbaImage) -> FramePixels {
    let (width, height) = img.dimensions();
    FramePixels {
        size: Size::new(width as i32, height as i32),
        rgba: img.into_raw(),
        rows_decoded: height as i32,
    }
}

fn count_gif_frames(bytes: &[u8]) -> usize {
    let Ok(decoder) = image::codecs::gif::GifDecoder::new(Cursor::new(bytes)) else {
        return 1;
    };
    let count = decoder.into_frames().take_while(|f| f.is_ok()).count();
    count.max(1)
}

fn classify(complete: bool, message: String) -> ImageError {
    if complete {
        ImageError::DataMalformed(message)
    } else {
        ImageError::DataIncomplete(message)
    }
}

fn map_image_error(complete: bool, err: image::ImageError) -> ImageError {
    match err {
        image::ImageError::Unsupported(e) => ImageError::Unsupported(e.to_string()),
        other => classify(complete, other.to_string()),
    }
}

/// Find an embedded JPEG (SOI..EOI) past the outer container header.
///
/// RAW previews and Exif thumbnails are stored as whole JPEG streams
/// inside the file; locating the marker pair is enough to slice them
/// out without understanding the surrounding IFD structure.
fn scan_for_embedded_jpeg(bytes: &[u8]) -> Option<Vec<u8>> {
    let start = bytes
        .windows(3)
        .enumerate()
        .skip(2)
        .find(|(_, w)| w[0] == JPEG_SOI[0] && w[1] == JPEG_SOI[1] && w[2] == 0xFF)
        .map(|(i, _)| i)?;
    let end = bytes[start..]
        .windows(2)
        .rposition(|w| w == JPEG_EOI)
        .map(|i| start + i + 2)?;
    if end - start < 4 {
        return None;
    }
    Some(bytes[start..end].to_vec())
}
