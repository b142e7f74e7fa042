//! Owned pixel memory with format metadata.
//!
//! A [`PixelBuffer`] owns one block of decoded or raw pixel bytes plus the
//! description needed to address it: size, storage format, alpha type, and
//! row stride. Colors cross the API boundary as unpremultiplied ARGB-8888
//! words no matter how the buffer stores them internally.
//!
//! # Lifecycle
//!
//! Buffers are created blank, from a color array, by decode, or by
//! transform. `release()` drops the pixel memory and is idempotent; every
//! other operation on a released buffer fails fast with an illegal-state
//! error. Dropping a buffer releases it implicitly, so explicit release is
//! only needed when the memory must go away before the value does.

use crate::alloc::BackingStore;
use crate::common::{
    decode_color, encode_color, fit_density_size, AlphaType, ImageInfo, PixelFormat, Position,
    Rect, Size, DENSITY_NONE, MAX_DIMENSION,
};
use crate::error::{ImageError, Result};

/// Options for creating a blank buffer or one initialized from colors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializationOptions {
    /// Buffer dimensions. Must be positive.
    pub size: Size,
    /// Storage format. `Unknown` resolves to ARGB 8888.
    pub pixel_format: PixelFormat,
    /// Alpha interpretation. `Unknown` resolves from the format.
    pub alpha_type: AlphaType,
    /// Whether write operations are permitted on the new buffer.
    pub editable: bool,
}

/// Owned, addressable block of pixel memory plus format metadata.
#[derive(Debug)]
pub struct PixelBuffer {
    info: ImageInfo,
    stride: usize,
    editable: bool,
    base_density: i32,
    use_mipmap: bool,
    backing: BackingStore,
    capacity: usize,
    /// `None` once released. The allocation itself never changes after
    /// creation; `reset_config` only reinterprets it.
    pixels: Option<Vec<u8>>,
}

impl PixelBuffer {
    /// Create a blank, zero-filled buffer.
    pub fn create(opts: &InitializationOptions) -> Result<Self> {
        let (format, alpha) = resolve_format(opts.pixel_format, opts.alpha_type);
        if !opts.size.is_valid() {
            return Err(ImageError::InvalidArgument(format!(
                "buffer size {}x{} is invalid",
                opts.size.width, opts.size.height
            )));
        }
        let stride = opts.size.width as usize * format.bytes_per_pixel();
        let byte_len = stride * opts.size.height as usize;
        Ok(Self::from_parts(
            ImageInfo::new(opts.size, format, alpha),
            vec![0u8; byte_len],
            opts.editable,
            DENSITY_NONE,
            BackingStore::Heap,
        ))
    }

    /// Create a buffer from an array of unpremultiplied ARGB color words.
    ///
    /// `offset` is the index of the first color used and `stride` the
    /// number of color words per row of the array; `stride` must be at
    /// least the buffer width.
    pub fn create_from_colors(
        colors: &[u32],
        offset: usize,
        stride: usize,
        opts: &InitializationOptions,
    ) -> Result<Self> {
        let mut buffer = Self::create(opts)?;
        let width = opts.size.width as usize;
        let height = opts.size.height as usize;
        if stride < width {
            return Err(ImageError::InvalidArgument(format!(
                "stride {stride} is smaller than width {width}"
            )));
        }
        let last = offset
            .checked_add((height - 1) * stride)
            .and_then(|v| v.checked_add(width));
        match last {
            Some(end) if end <= colors.len() => {}
            _ => {
                return Err(ImageError::OutOfBounds(format!(
                    "color array of {} words cannot fill {width}x{height} at offset {offset}, stride {stride}",
                    colors.len()
                )));
            }
        }

        let was_editable = buffer.editable;
        buffer.editable = true;
        for y in 0..height {
            let row = &colors[offset + y * stride..offset + y * stride + width];
            for (x, color) in row.iter().enumerate() {
                buffer.store_color(x, y, *color)?;
            }
        }
        buffer.editable = was_editable;
        Ok(buffer)
    }

    /// Assemble a buffer from already-produced parts. Used by decode,
    /// transform, and the transport parcel.
    pub(crate) fn from_parts(
        info: ImageInfo,
        pixels: Vec<u8>,
        editable: bool,
        base_density: i32,
        backing: BackingStore,
    ) -> Self {
        let capacity = pixels.len();
        Self {
            stride: info.size.width as usize * info.pixel_format.bytes_per_pixel(),
            info,
            editable,
            base_density,
            use_mipmap: false,
            backing,
            capacity,
            pixels: Some(pixels),
        }
    }

    /// Static description of this buffer.
    pub fn image_info(&self) -> ImageInfo {
        self.info
    }

    /// Bytes each pixel row occupies.
    pub fn bytes_per_row(&self) -> usize {
        self.stride
    }

    /// Bytes the current size/format interpretation actually uses.
    pub fn pixel_bytes_number(&self) -> usize {
        self.stride * self.info.size.height as usize
    }

    /// Bytes held by the underlying allocation. Never less than
    /// [`pixel_bytes_number`](Self::pixel_bytes_number).
    pub fn pixel_bytes_capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_released(&self) -> bool {
        self.pixels.is_none()
    }

    pub fn backing_store(&self) -> BackingStore {
        self.backing
    }

    pub fn base_density(&self) -> i32 {
        self.base_density
    }

    pub fn set_base_density(&mut self, base_density: i32) {
        self.base_density = base_density;
    }

    pub fn use_mipmap(&self) -> bool {
        self.use_mipmap
    }

    pub fn set_use_mipmap(&mut self, use_mipmap: bool) {
        self.use_mipmap = use_mipmap;
    }

    /// Change the alpha interpretation without touching pixel data.
    pub fn set_alpha_type(&mut self, alpha_type: AlphaType) -> Result<()> {
        if alpha_type == AlphaType::Unknown {
            return Err(ImageError::InvalidArgument(
                "alpha type must not be Unknown".to_string(),
            ));
        }
        self.check_released("set_alpha_type")?;
        self.info.alpha_type = alpha_type;
        Ok(())
    }

    /// Read one pixel as an unpremultiplied ARGB color word.
    pub fn read_pixel(&self, pos: Position) -> Result<u32> {
        if !pos.is_valid() {
            return Err(ImageError::InvalidArgument(format!(
                "position ({}, {}) is invalid",
                pos.x, pos.y
            )));
        }
        self.check_released("read_pixel")?;
        self.check_in_image(pos)?;
        self.load_color(pos.x as usize, pos.y as usize)
    }

    /// Write one unpremultiplied ARGB color word.
    pub fn write_pixel(&mut self, pos: Position, color: u32) -> Result<()> {
        if !pos.is_valid() {
            return Err(ImageError::InvalidArgument(format!(
                "position ({}, {}) is invalid",
                pos.x, pos.y
            )));
        }
        self.check_writable("write_pixel")?;
        self.check_in_image(pos)?;
        self.store_color(pos.x as usize, pos.y as usize, color)
    }

    /// Read a region into `dest` as ARGB color words.
    ///
    /// `offset` indexes the first word written and `stride` is the number
    /// of words per destination row. A destination too small for the
    /// region is an out-of-bounds failure, never a silent truncation.
    pub fn read_pixels(&self, dest: &mut [u32], offset: usize, stride: usize, region: Rect) -> Result<()> {
        self.check_region_args(dest.len(), offset, stride, region, "read_pixels")?;
        self.check_released("read_pixels")?;
        for y in 0..region.height as usize {
            for x in 0..region.width as usize {
                let color =
                    self.load_color(region.min_x as usize + x, region.min_y as usize + y)?;
                dest[offset + y * stride + x] = color;
            }
        }
        Ok(())
    }

    /// Write ARGB color words from `src` into a region of this buffer.
    pub fn write_pixels(&mut self, src: &[u32], offset: usize, stride: usize, region: Rect) -> Result<()> {
        self.check_region_args(src.len(), offset, stride, region, "write_pixels")?;
        self.check_writable("write_pixels")?;
        for y in 0..region.height as usize {
            for x in 0..region.width as usize {
                let color = src[offset + y * stride + x];
                self.store_color(region.min_x as usize + x, region.min_y as usize + y, color)?;
            }
        }
        Ok(())
    }

    /// Fill the whole buffer with one ARGB color word.
    pub fn fill(&mut self, color: u32) -> Result<()> {
        self.check_writable("fill")?;
        let size = self.info.size;
        for y in 0..size.height as usize {
            for x in 0..size.width as usize {
                self.store_color(x, y, color)?;
            }
        }
        Ok(())
    }

    /// Copy the used pixel bytes into `dst` verbatim.
    pub fn read_bytes(&self, dst: &mut [u8]) -> Result<()> {
        self.check_released("read_bytes")?;
        let used = self.pixel_bytes_number();
        if dst.len() < used {
            return Err(ImageError::OutOfBounds(format!(
                "destination holds {} bytes, buffer uses {used}",
                dst.len()
            )));
        }
        let pixels = self.pixels.as_ref().expect("checked above");
        dst[..used].copy_from_slice(&pixels[..used]);
        Ok(())
    }

    /// Overwrite the used pixel bytes from `src` verbatim.
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.check_writable("write_bytes")?;
        let used = self.pixel_bytes_number();
        if src.len() < used {
            return Err(ImageError::OutOfBounds(format!(
                "source holds {} bytes, buffer uses {used}",
                src.len()
            )));
        }
        let pixels = self.pixels.as_mut().expect("checked by check_writable");
        pixels[..used].copy_from_slice(&src[..used]);
        Ok(())
    }

    /// Reinterpret the existing allocation with a new size and format.
    ///
    /// No reallocation happens. Shrinking the required byte size is
    /// allowed; growing it past the existing capacity fails with an
    /// illegal-state error. The row stride becomes `width * bpp`.
    pub fn reset_config(&mut self, size: Size, pixel_format: PixelFormat) -> Result<()> {
        if !size.is_valid() {
            return Err(ImageError::InvalidArgument(format!(
                "reset size {}x{} is invalid",
                size.width, size.height
            )));
        }
        if pixel_format == PixelFormat::Unknown {
            return Err(ImageError::InvalidArgument(
                "reset format must not be Unknown".to_string(),
            ));
        }
        self.check_released("reset_config")?;
        let new_stride = size.width as usize * pixel_format.bytes_per_pixel();
        let required = new_stride * size.height as usize;
        if required > self.capacity {
            return Err(ImageError::IllegalState(format!(
                "reset needs {required} bytes but capacity is {}",
                self.capacity
            )));
        }
        self.info.size = size;
        self.info.pixel_format = pixel_format;
        self.stride = new_stride;
        Ok(())
    }

    /// Rescale this buffer's size from its base density to `target_density`.
    ///
    /// Identity when either density is zero or they match.
    pub fn get_fit_density_size(&self, target_density: i32) -> Result<Size> {
        self.check_released("get_fit_density_size")?;
        Ok(fit_density_size(self.info.size, self.base_density, target_density))
    }

    /// Derive a single-channel buffer holding only the alpha plane.
    ///
    /// The result is `Alpha8`, same size, straight-alpha, and editable
    /// like the source.
    pub fn create_from_alpha(&self) -> Result<PixelBuffer> {
        self.check_released("create_from_alpha")?;
        if !self.info.pixel_format.has_alpha() {
            return Err(ImageError::Unsupported(format!(
                "{:?} has no alpha channel to extract",
                self.info.pixel_format
            )));
        }
        let size = self.info.size;
        let mut plane = vec![0u8; size.pixel_count() as usize];
        for y in 0..size.height as usize {
            for x in 0..size.width as usize {
                let color = self.load_color(x, y)?;
                plane[y * size.width as usize + x] = (color >> 24) as u8;
            }
        }
        Ok(PixelBuffer::from_parts(
            ImageInfo::new(size, PixelFormat::Alpha8, AlphaType::Unpremul),
            plane,
            self.editable,
            self.base_density,
            self.backing,
        ))
    }

    /// Compare static description and full pixel content.
    ///
    /// Buffers of differing size or format are never equal. Either side
    /// being released also compares unequal.
    pub fn is_same_image(&self, other: &PixelBuffer) -> bool {
        if self.info != other.info {
            return false;
        }
        match (&self.pixels, &other.pixels) {
            (Some(a), Some(b)) => {
                let used = self.pixel_bytes_number();
                a[..used] == b[..used]
            }
            _ => false,
        }
    }

    /// Drop the pixel memory. Idempotent; a second release is a no-op.
    pub fn release(&mut self) {
        self.pixels = None;
    }

    fn check_released(&self, op: &str) -> Result<()> {
        if self.is_released() {
            log::error!("{op} on released pixel buffer");
            return Err(ImageError::IllegalState(format!(
                "{op} on a released pixel buffer"
            )));
        }
        Ok(())
    }

    fn check_writable(&self, op: &str) -> Result<()> {
        self.check_released(op)?;
        if !self.editable {
            return Err(ImageError::IllegalState(format!(
                "{op} on a non-editable pixel buffer"
            )));
        }
        Ok(())
    }

    fn check_in_image(&self, pos: Position) -> Result<()> {
        if pos.x >= self.info.size.width || pos.y >= self.info.size.height {
            return Err(ImageError::InvalidArgument(format!(
                "position ({}, {}) outside {}x{} image",
                pos.x, pos.y, self.info.size.width, self.info.size.height
            )));
        }
        Ok(())
    }

    fn check_region_args(
        &self,
        array_len: usize,
        offset: usize,
        stride: usize,
        region: Rect,
        op: &str,
    ) -> Result<()> {
        if region.width < 0
            || region.height < 0
            || region.width > MAX_DIMENSION
            || region.height > MAX_DIMENSION
        {
            return Err(ImageError::InvalidArgument(format!("{op} region is invalid")));
        }
        if !region.fits_within(self.info.size) {
            return Err(ImageError::InvalidArgument(format!(
                "{op} region ({}, {}, {}, {}) outside {}x{} image",
                region.min_x,
                region.min_y,
                region.width,
                region.height,
                self.info.size.width,
                self.info.size.height
            )));
        }
        if offset > array_len {
            return Err(ImageError::InvalidArgument(format!(
                "{op} offset {offset} past array length {array_len}"
            )));
        }
        if stride < region.width as usize {
            return Err(ImageError::InvalidArgument(format!(
                "{op} stride {stride} smaller than region width {}",
                region.width
            )));
        }
        let needed = offset + (region.height as usize - 1) * stride + region.width as usize;
        if needed > array_len {
            return Err(ImageError::OutOfBounds(format!(
                "{op} needs {needed} color words, array holds {array_len}"
            )));
        }
        Ok(())
    }

    fn byte_offset(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * self.info.pixel_format.bytes_per_pixel()
    }

    fn load_color(&self, x: usize, y: usize) -> Result<u32> {
        let bpp = self.info.pixel_format.bytes_per_pixel();
        let start = self.byte_offset(x, y);
        let pixels = self
            .pixels
            .as_ref()
            .ok_or_else(|| ImageError::IllegalState("buffer released".to_string()))?;
        decode_color(self.info.pixel_format, &pixels[start..start + bpp])
    }

    fn store_color(&mut self, x: usize, y: usize, color: u32) -> Result<()> {
        let format = self.info.pixel_format;
        let start = self.byte_offset(x, y);
        let mut encoded = [0u8; 4];
        let n = encode_color(format, color, &mut encoded)?;
        let pixels = self
            .pixels
            .as_mut()
            .ok_or_else(|| ImageError::IllegalState("buffer released".to_string()))?;
        pixels[start..start + n].copy_from_slice(&encoded[..n]);
        Ok(())
    }
}

fn resolve_format(format: PixelFormat, alpha: AlphaType) -> (PixelFormat, AlphaType) {
    let format = if format == PixelFormat::Unknown {
        PixelFormat::Argb8888
    } else {
        format
    };
    let alpha = if alpha == AlphaType::Unknown {
        if format.has_alpha() {
            AlphaType::Unpremul
        } else {
            AlphaType::Opaque
        }
    } else {
        alpha
    };
    (format, alpha)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
