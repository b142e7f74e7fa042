//! Cross-process transport encoding for pixel buffers.
//!
//! A buffer travels as a length-prefixed record with a leading presence
//! flag so the channel can say "no buffer" without a sentinel size:
//!
//! ```text
//! presence:u8  (0 = absent, record ends here)
//! width:u32  height:u32  format:u32  alpha:u32  stride:u32
//! pixel_len:u64  pixel_bytes:[u8]
//! ```
//!
//! All integers are big-endian. The transport primitive that moves the
//! bytes between processes is an external collaborator; this module only
//! defines the record.

use crate::alloc::BackingStore;
use crate::common::{AlphaType, ImageInfo, PixelFormat, Size, MAX_DIMENSION};
use crate::error::{ImageError, Result};

use super::buffer::PixelBuffer;

/// Append-only write / cursor-read byte carrier for transport records.
#[derive(Debug, Default)]
pub struct Parcel {
    bytes: Vec<u8>,
    cursor: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap received bytes for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let slice = self.take(1)?;
        Ok(slice[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let slice = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(slice);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if self.cursor + len > self.bytes.len() {
            return Err(ImageError::DataMalformed(format!(
                "parcel truncated: need {len} bytes at offset {}, have {}",
                self.cursor,
                self.bytes.len() - self.cursor
            )));
        }
        let slice = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }
}

/// Marshal a buffer (or its absence) into `parcel`.
///
/// A released buffer cannot be marshalled; pass `None` to encode
/// "no buffer".
pub fn marshal(buffer: Option<&PixelBuffer>, parcel: &mut Parcel) -> Result<()> {
    let Some(buffer) = buffer else {
        parcel.write_u8(0);
        return Ok(());
    };
    if buffer.is_released() {
        return Err(ImageError::IllegalState(
            "cannot marshal a released pixel buffer".to_string(),
        ));
    }
    let info = buffer.image_info();
    let used = buffer.pixel_bytes_number();
    let mut pixels = vec![0u8; used];
    buffer.read_bytes(&mut pixels)?;

    parcel.write_u8(1);
    parcel.write_u32(info.size.width as u32);
    parcel.write_u32(info.size.height as u32);
    parcel.write_u32(info.pixel_format as u32);
    parcel.write_u32(info.alpha_type as u32);
    parcel.write_u32(buffer.bytes_per_row() as u32);
    parcel.write_u64(used as u64);
    parcel.write_bytes(&pixels);
    Ok(())
}

/// Unmarshal the next record from `parcel`.
///
/// Returns `Ok(None)` for an absent buffer. Structural problems --
/// truncation, impossible geometry, a stride that disagrees with the
/// format -- fail as malformed data.
pub fn unmarshal(parcel: &mut Parcel) -> Result<Option<PixelBuffer>> {
    if parcel.read_u8()? == 0 {
        return Ok(None);
    }
    let width = parcel.read_u32()?;
    let height = parcel.read_u32()?;
    let format = PixelFormat::from(parcel.read_u32()?);
    let alpha = AlphaType::from(parcel.read_u32()?);
    let stride = parcel.read_u32()? as usize;
    let pixel_len = parcel.read_u64()? as usize;

    if width == 0 || height == 0 || width > MAX_DIMENSION as u32 || height > MAX_DIMENSION as u32 {
        return Err(ImageError::DataMalformed(format!(
            "parcel carries impossible size {width}x{height}"
        )));
    }
    if format == PixelFormat::Unknown {
        return Err(ImageError::DataMalformed(
            "parcel carries unknown pixel format".to_string(),
        ));
    }
    let expected_stride = width as usize * format.bytes_per_pixel();
    if stride != expected_stride || pixel_len != stride * height as usize {
        return Err(ImageError::DataMalformed(format!(
            "parcel stride {stride} / length {pixel_len} disagree with {width}x{height} {format:?}"
        )));
    }
    let pixels = parcel.read_bytes(pixel_len)?;

    let size = Size::new(width as i32, height as i32);
    Ok(Some(PixelBuffer::from_parts(
        ImageInfo::new(size, format, alpha),
        pixels,
        false,
        crate::common::DENSITY_NONE,
        BackingStore::Heap,
    )))
}
