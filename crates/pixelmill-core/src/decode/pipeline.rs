//! The decode pipeline: encoded bytes in, pixel buffer out.
//!
//! One pipeline instance serves any number of decode calls over any
//! number of source handles. Each call runs the same fixed sequence:
//! header probe, header event, allocator consultation, frame decode,
//! geometry (crop, decimate, rotate, scale, density fit), format
//! conversion, completion event. Option order never changes operation
//! order.

use image::RgbaImage;

use crate::alloc::AllocatorPolicy;
use crate::common::{
    fit_density_size, AlphaType, DisplayDensityConfig, ImageInfo, PixelFormat, Rect, Size,
    DENSITY_NONE,
};
use crate::error::{ImageError, Result};
use crate::pixel::PixelBuffer;
use crate::source::SourceHandle;
use crate::transform::{resize_exact, rgba_to_pixel_bytes, rotate_rgba, FilterType};

use super::codec::{Codec, RegistryCodec};
use super::events::{DecodeControl, DecodeEvent};
use super::options::DecodingOptions;

/// Container-level description of a source, available before any frame
/// is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Number of top-level frames in the container.
    pub top_level_image_num: usize,
    /// MIME-style container name, e.g. `"image/gif"`.
    pub encoded_format: String,
}

/// Drives the external codec to turn source bytes into pixel buffers.
pub struct DecodePipeline {
    codec: Box<dyn Codec>,
    policy: AllocatorPolicy,
    density: DisplayDensityConfig,
}

impl DecodePipeline {
    pub fn new(codec: Box<dyn Codec>, policy: AllocatorPolicy, density: DisplayDensityConfig) -> Self {
        Self {
            codec,
            policy,
            density,
        }
    }

    /// Pipeline over the registry codec with default policy and density.
    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(RegistryCodec::new()),
            AllocatorPolicy::default(),
            DisplayDensityConfig::default(),
        )
    }

    /// Decode frame `index` of `source` according to `options`.
    pub fn decode(
        &self,
        source: &mut SourceHandle,
        index: usize,
        options: &DecodingOptions,
    ) -> Result<PixelBuffer> {
        source.check_released("decode")?;
        validate_options(options)?;

        let complete = source.is_complete();

        // 1. Header. Incomplete and malformed classifications propagate
        // from the codec boundary unchanged.
        let probed = self.codec.probe(source.bytes()?, complete)?;
        if index >= probed.frame_count {
            return Err(ImageError::InvalidArgument(format!(
                "frame index {index} out of range ({} frames)",
                probed.frame_count
            )));
        }
        let source_alpha = if probed.has_alpha {
            AlphaType::Unpremul
        } else {
            AlphaType::Opaque
        };

        // 2. Header event. The observer's one chance to change the
        // memory preference in time for this decode's allocation.
        let header_info = ImageInfo::new(probed.size, PixelFormat::Unknown, source_alpha);
        self.dispatch_event(source, DecodeEvent::HeaderDecoded, &header_info);

        // 3. Destination selection.
        let selection = self.policy.select(
            options.allocator,
            source.memory_usage_preference(),
            options.desired_pixel_format,
            source_alpha,
        );

        // 4. Frame decode.
        let frame = self
            .codec
            .decode_frame(source.bytes()?, complete, index)?;
        let partial = !frame.is_complete();
        if partial && !options.allow_partial_image {
            return Err(ImageError::DataIncomplete(format!(
                "only {} of {} rows decoded",
                frame.rows_decoded, frame.size.height
            )));
        }

        let mut img = RgbaImage::from_raw(
            frame.size.width as u32,
            frame.size.height as u32,
            frame.rgba,
        )
        .ok_or_else(|| ImageError::DataMalformed("codec returned short pixel data".to_string()))?;

        // 5. Geometry, always in this order: crop, decimate, rotate,
        // scale, density fit.
        img = apply_region(img, options.desired_region)?;
        img = apply_sample_size(img, options);
        img = rotate_rgba(&img, options.rotate_degrees);
        if !options.desired_size.is_empty() {
            if !options.desired_size.is_valid() {
                return Err(ImageError::InvalidArgument(format!(
                    "desired size {}x{} is invalid",
                    options.desired_size.width, options.desired_size.height
                )));
            }
            img = resize_exact(img, options.desired_size, FilterType::Bilinear);
        }

        let mut base_density = source.options().base_density;
        if base_density == DENSITY_NONE {
            base_density = self.density.default_base_density;
        }
        if options.fit_density != DENSITY_NONE && options.fit_density != base_density {
            let fitted = fit_density_size(
                Size::new(img.width() as i32, img.height() as i32),
                base_density,
                options.fit_density,
            );
            img = resize_exact(img, fitted, FilterType::Bilinear);
            base_density = options.fit_density;
        }

        // 6. Destination conversion.
        let out_size = Size::new(img.width() as i32, img.height() as i32);
        let out_alpha = if selection.format == PixelFormat::Rgb565 {
            AlphaType::Opaque
        } else {
            source_alpha
        };
        let bytes = rgba_to_pixel_bytes(&img, selection.format)?;
        let buffer = PixelBuffer::from_parts(
            ImageInfo::new(out_size, selection.format, out_alpha),
            bytes,
            options.editable,
            base_density,
            selection.backing,
        );

        let final_info = buffer.image_info();
        let event = if partial {
            DecodeEvent::PartialDecoded
        } else {
            DecodeEvent::CompleteDecoded
        };
        self.dispatch_event(source, event, &final_info);
        Ok(buffer)
    }

    /// Decode the embedded thumbnail of `source`.
    ///
    /// Falls back to decoding the full image when the container has no
    /// thumbnail and `allow_from_image` permits it.
    pub fn decode_thumbnail(
        &self,
        source: &mut SourceHandle,
        options: &DecodingOptions,
        allow_from_image: bool,
    ) -> Result<PixelBuffer> {
        source.check_released("decode_thumbnail")?;
        match self.codec.extract_thumbnail(source.bytes()?) {
            Ok(jpeg) => {
                let mut thumb_source =
                    SourceHandle::from_bytes(&jpeg, source.options().clone())?;
                self.decode(&mut thumb_source, 0, options)
            }
            Err(ImageError::Unsupported(_)) if allow_from_image => self.decode(source, 0, options),
            Err(err) => Err(err),
        }
    }

    /// Container-level information: frame count and encoded format.
    pub fn source_info(&self, source: &SourceHandle) -> Result<SourceInfo> {
        source.check_released("source_info")?;
        let probed = self.codec.probe(source.bytes()?, source.is_complete())?;
        Ok(SourceInfo {
            top_level_image_num: probed.frame_count,
            encoded_format: probed.container_format,
        })
    }

    /// Best-known image information for frame `index` without decoding
    /// pixel data. Only the size is populated before a full decode.
    pub fn image_info(&self, source: &SourceHandle, index: usize) -> Result<ImageInfo> {
        source.check_released("image_info")?;
        let probed = self.codec.probe(source.bytes()?, source.is_complete())?;
        if index >= probed.frame_count {
            return Err(ImageError::InvalidArgument(format!(
                "frame index {index} out of range ({} frames)",
                probed.frame_count
            )));
        }
        let alpha = if probed.has_alpha {
            AlphaType::Unpremul
        } else {
            AlphaType::Opaque
        };
        Ok(ImageInfo::new(probed.size, PixelFormat::Unknown, alpha))
    }

    fn dispatch_event(&self, source: &mut SourceHandle, event: DecodeEvent, info: &ImageInfo) {
        if let Some(mut observer) = source.take_observer() {
            let mut control = DecodeControl::default();
            observer.on_decode_event(event, info, &mut control);
            if let Some(preference) = control.take_preference() {
                source.set_memory_usage_preference(preference);
            }
            source.put_observer(observer);
        }
    }
}

fn validate_options(options: &DecodingOptions) -> Result<()> {
    if options.sample_size < 1 {
        return Err(ImageError::InvalidArgument(format!(
            "sample size {} must be at least 1",
            options.sample_size
        )));
    }
    if !(0.0..360.0).contains(&options.rotate_degrees) {
        return Err(ImageError::InvalidArgument(format!(
            "rotate degrees {} outside [0, 360)",
            options.rotate_degrees
        )));
    }
    if options.desired_size.width < 0 || options.desired_size.height < 0 {
        return Err(ImageError::InvalidArgument(
            "desired size must not be negative".to_string(),
        ));
    }
    if options.fit_density < 0 {
        return Err(ImageError::InvalidArgument(
            "fit density must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn apply_region(img: RgbaImage, region: Rect) -> Result<RgbaImage> {
    if region.is_empty() {
        return Ok(img);
    }
    let bounds = Size::new(img.width() as i32, img.height() as i32);
    if !region.fits_within(bounds) {
        return Err(ImageError::InvalidArgument(format!(
            "region ({}, {}, {}, {}) outside {}x{} image",
            region.min_x, region.min_y, region.width, region.height, bounds.width, bounds.height
        )));
    }
    Ok(image::imageops::crop_imm(
        &img,
        region.min_x as u32,
        region.min_y as u32,
        region.width as u32,
        region.height as u32,
    )
    .to_image())
}

fn apply_sample_size(img: RgbaImage, options: &DecodingOptions) -> RgbaImage {
    // An explicit desired size wins over decimation.
    if !options.desired_size.is_empty() || options.sample_size <= 1 {
        return img;
    }
    let sample = options.sample_size;
    let target = Size::new(
        (img.width() / sample).max(1) as i32,
        (img.height() / sample).max(1) as i32,
    );
    resize_exact(img, target, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{AllocatorKind, MemoryUsagePreference, Position};
    use crate::decode::codec::{FramePixels, ProbedImage};
    use crate::decode::events::DecodeObserver;
    use crate::source::{IncrementalSourceOptions, SourceOptions, UpdateMode};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("png encode");
        out
    }

    fn png_source(width: u32, height: u32) -> SourceHandle {
        SourceHandle::from_bytes(&encode_png(width, height), SourceOptions::default()).unwrap()
    }

    #[test]
    fn test_native_size_decode() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(472, 75);

        let buffer = pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        assert_eq!(buffer.image_info().size, Size::new(472, 75));
    }

    #[test]
    fn test_desired_size_overrides_sample_size() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(64, 64);

        let opts = DecodingOptions {
            desired_size: Size::new(10, 20),
            sample_size: 4,
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.image_info().size, Size::new(10, 20));
    }

    #[test]
    fn test_sample_size_decimation() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(64, 32);

        let opts = DecodingOptions {
            sample_size: 4,
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.image_info().size, Size::new(16, 8));
    }

    #[test]
    fn test_region_crop() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(40, 40);

        let opts = DecodingOptions {
            desired_region: Rect::new(5, 10, 20, 8),
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.image_info().size, Size::new(20, 8));
    }

    #[test]
    fn test_region_outside_image_rejected() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(10, 10);

        let opts = DecodingOptions {
            desired_region: Rect::new(5, 5, 10, 10),
            ..Default::default()
        };
        let result = pipeline.decode(&mut source, 0, &opts);
        assert!(matches!(result, Err(ImageError::InvalidArgument(_))));
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(30, 10);

        let opts = DecodingOptions {
            rotate_degrees: 90.0,
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.image_info().size, Size::new(10, 30));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(4, 4);

        let opts = DecodingOptions {
            sample_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            pipeline.decode(&mut source, 0, &opts),
            Err(ImageError::InvalidArgument(_))
        ));

        let opts = DecodingOptions {
            rotate_degrees: 360.0,
            ..Default::default()
        };
        assert!(matches!(
            pipeline.decode(&mut source, 0, &opts),
            Err(ImageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_editable_flag_carried() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(4, 4);

        let opts = DecodingOptions {
            editable: true,
            ..Default::default()
        };
        let mut buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert!(buffer.is_editable());
        buffer.write_pixel(Position::new(0, 0), 0xFF000000).unwrap();
    }

    #[test]
    fn test_released_source_rejected() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(4, 4);
        source.release();
        assert!(matches!(
            pipeline.decode(&mut source, 0, &DecodingOptions::default()),
            Err(ImageError::IllegalState(_))
        ));
    }

    #[test]
    fn test_frame_index_out_of_range() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(4, 4);
        assert!(matches!(
            pipeline.decode(&mut source, 3, &DecodingOptions::default()),
            Err(ImageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_bytes() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source =
            SourceHandle::from_bytes(&[0xA5u8; 64], SourceOptions::default()).unwrap();
        assert!(matches!(
            pipeline.decode(&mut source, 0, &DecodingOptions::default()),
            Err(ImageError::DataMalformed(_))
        ));
    }

    #[test]
    fn test_low_ram_preference_downgrades_opaque_jpeg() {
        let pipeline = DecodePipeline::with_defaults();
        // JPEG probes as no-alpha; PNG would not downgrade
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let mut source = SourceHandle::from_bytes(&jpeg, SourceOptions::default()).unwrap();
        source.set_memory_usage_preference(MemoryUsagePreference::LowRam);
        let buffer = pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        let info = buffer.image_info();
        assert_eq!(info.pixel_format, PixelFormat::Rgb565);
        assert_eq!(info.alpha_type, AlphaType::Opaque);
    }

    #[test]
    fn test_explicit_allocator_hint_falls_back_to_heap() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(4, 4);
        let opts = DecodingOptions {
            allocator: AllocatorKind::SharedMemory,
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.backing_store(), crate::alloc::BackingStore::Heap);
    }

    #[test]
    fn test_fit_density_rescales_output() {
        let pipeline = DecodePipeline::with_defaults();
        let bytes = encode_png(100, 50);
        let mut source = SourceHandle::from_bytes(
            &bytes,
            SourceOptions {
                base_density: 160,
                ..Default::default()
            },
        )
        .unwrap();

        let opts = DecodingOptions {
            fit_density: 320,
            ..Default::default()
        };
        let buffer = pipeline.decode(&mut source, 0, &opts).unwrap();
        assert_eq!(buffer.image_info().size, Size::new(200, 100));
        assert_eq!(buffer.base_density(), 320);
    }

    #[test]
    fn test_source_info_and_image_info() {
        let pipeline = DecodePipeline::with_defaults();
        let source = png_source(6, 9);

        let info = pipeline.source_info(&source).unwrap();
        assert_eq!(info.top_level_image_num, 1);
        assert_eq!(info.encoded_format, "image/png");

        let image_info = pipeline.image_info(&source, 0).unwrap();
        assert_eq!(image_info.size, Size::new(6, 9));
        assert!(matches!(
            pipeline.image_info(&source, 2),
            Err(ImageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_decode_thumbnail_from_embedded_jpeg() {
        use crate::decode::codec::test_fixtures::MINIMAL_JPEG;
        let pipeline = DecodePipeline::with_defaults();

        let mut container = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        container.extend_from_slice(MINIMAL_JPEG);
        let mut source = SourceHandle::from_bytes(&container, SourceOptions::default()).unwrap();

        let buffer = pipeline
            .decode_thumbnail(&mut source, &DecodingOptions::default(), false)
            .unwrap();
        assert_eq!(buffer.image_info().size, Size::new(1, 1));
    }

    #[test]
    fn test_decode_thumbnail_fallback_policy() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(8, 8);

        // No embedded thumbnail: fall back only when allowed
        let buffer = pipeline
            .decode_thumbnail(&mut source, &DecodingOptions::default(), true)
            .unwrap();
        assert_eq!(buffer.image_info().size, Size::new(8, 8));

        assert!(matches!(
            pipeline.decode_thumbnail(&mut source, &DecodingOptions::default(), false),
            Err(ImageError::Unsupported(_))
        ));
    }

    // ---- observer protocol ----

    struct RecordingObserver {
        events: Rc<RefCell<Vec<(DecodeEvent, Size)>>>,
        set_low_ram_at_header: bool,
    }

    impl DecodeObserver for RecordingObserver {
        fn on_decode_event(&mut self, event: DecodeEvent, info: &ImageInfo, control: &mut DecodeControl) {
            self.events.borrow_mut().push((event, info.size));
            if self.set_low_ram_at_header && event == DecodeEvent::HeaderDecoded {
                control.set_memory_usage_preference(MemoryUsagePreference::LowRam);
            }
        }
    }

    #[test]
    fn test_event_order_header_then_complete() {
        let pipeline = DecodePipeline::with_defaults();
        let mut source = png_source(12, 6);
        let events = Rc::new(RefCell::new(Vec::new()));
        source.set_decode_observer(Box::new(RecordingObserver {
            events: events.clone(),
            set_low_ram_at_header: false,
        }));

        pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, DecodeEvent::HeaderDecoded);
        assert_eq!(events[0].1, Size::new(12, 6));
        assert_eq!(events[1].0, DecodeEvent::CompleteDecoded);
    }

    #[test]
    fn test_header_preference_affects_current_decode() {
        let pipeline = DecodePipeline::with_defaults();

        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let mut source = SourceHandle::from_bytes(&jpeg, SourceOptions::default()).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        source.set_decode_observer(Box::new(RecordingObserver {
            events,
            set_low_ram_at_header: true,
        }));

        let buffer = pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        assert_eq!(buffer.image_info().pixel_format, PixelFormat::Rgb565);
    }

    // ---- incremental decode over a scripted codec ----

    /// Codec whose behavior depends only on byte counts: header at 4
    /// bytes, one row per 2 further bytes, 4 rows total.
    struct ScriptedCodec;

    const SCRIPT_HEADER_AT: usize = 4;
    const SCRIPT_ROWS: i32 = 4;
    const SCRIPT_FULL_AT: usize = SCRIPT_HEADER_AT + (SCRIPT_ROWS as usize) * 2;

    impl Codec for ScriptedCodec {
        fn probe(&self, bytes: &[u8], complete: bool) -> crate::error::Result<ProbedImage> {
            if bytes.len() < SCRIPT_HEADER_AT {
                return Err(classify_script(complete));
            }
            Ok(ProbedImage {
                size: Size::new(2, SCRIPT_ROWS),
                container_format: "image/x-scripted".to_string(),
                frame_count: 1,
                has_alpha: false,
            })
        }

        fn decode_frame(&self, bytes: &[u8], complete: bool, _index: usize) -> crate::error::Result<FramePixels> {
            if bytes.len() < SCRIPT_HEADER_AT {
                return Err(classify_script(complete));
            }
            let rows = (((bytes.len() - SCRIPT_HEADER_AT) / 2) as i32).min(SCRIPT_ROWS);
            if rows == 0 {
                return Err(classify_script(complete));
            }
            let mut rgba = vec![0u8; 2 * SCRIPT_ROWS as usize * 4];
            for row in 0..rows as usize {
                for px in 0..2 {
                    let at = (row * 2 + px) * 4;
                    rgba[at..at + 4].copy_from_slice(&[128, 128, 128, 255]);
                }
            }
            Ok(FramePixels {
                size: Size::new(2, SCRIPT_ROWS),
                rgba,
                rows_decoded: rows,
            })
        }

        fn extract_thumbnail(&self, _bytes: &[u8]) -> crate::error::Result<Vec<u8>> {
            Err(ImageError::Unsupported("no embedded thumbnail".to_string()))
        }
    }

    fn classify_script(complete: bool) -> ImageError {
        if complete {
            ImageError::DataMalformed("scripted: short data".to_string())
        } else {
            ImageError::DataIncomplete("scripted: need more bytes".to_string())
        }
    }

    fn scripted_pipeline() -> DecodePipeline {
        DecodePipeline::new(
            Box::new(ScriptedCodec),
            AllocatorPolicy::default(),
            DisplayDensityConfig::default(),
        )
    }

    fn incremental_source() -> SourceHandle {
        SourceHandle::incremental(IncrementalSourceOptions {
            opts: SourceOptions::default(),
            mode: UpdateMode::IncrementalData,
        })
    }

    #[test]
    fn test_incremental_header_not_yet_available() {
        let pipeline = scripted_pipeline();
        let mut source = incremental_source();
        source.update_data(&[1, 2], 0, 2, false).unwrap();

        let result = pipeline.decode(&mut source, 0, &DecodingOptions::default());
        assert!(matches!(result, Err(ImageError::DataIncomplete(_))));
    }

    #[test]
    fn test_incremental_partial_then_complete() {
        let pipeline = scripted_pipeline();
        let mut source = incremental_source();
        let events = Rc::new(RefCell::new(Vec::new()));
        source.set_decode_observer(Box::new(RecordingObserver {
            events: events.clone(),
            set_low_ram_at_header: false,
        }));

        // Header plus two of four rows
        let prefix = vec![0u8; SCRIPT_HEADER_AT + 4];
        source.update_data(&prefix, 0, prefix.len(), false).unwrap();
        let buffer = pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        assert_eq!(buffer.image_info().size, Size::new(2, SCRIPT_ROWS));
        {
            let events = events.borrow();
            assert_eq!(
                events.iter().map(|(e, _)| *e).collect::<Vec<_>>(),
                vec![DecodeEvent::HeaderDecoded, DecodeEvent::PartialDecoded]
            );
        }
        events.borrow_mut().clear();

        // Remaining rows arrive and the stream is final
        let rest = vec![0u8; SCRIPT_FULL_AT - prefix.len()];
        source.update_data(&rest, 0, rest.len(), true).unwrap();
        pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        {
            let events = events.borrow();
            assert_eq!(
                events.iter().map(|(e, _)| *e).collect::<Vec<_>>(),
                vec![DecodeEvent::HeaderDecoded, DecodeEvent::CompleteDecoded]
            );
        }

        // Completeness is monotonic: decoding again at the same final
        // byte count stays complete.
        events.borrow_mut().clear();
        pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        assert_eq!(
            events.borrow().iter().map(|(e, _)| *e).collect::<Vec<_>>(),
            vec![DecodeEvent::HeaderDecoded, DecodeEvent::CompleteDecoded]
        );
    }

    #[test]
    fn test_partial_rejected_when_not_allowed() {
        let pipeline = scripted_pipeline();
        let mut source = incremental_source();
        let prefix = vec![0u8; SCRIPT_HEADER_AT + 2];
        source.update_data(&prefix, 0, prefix.len(), false).unwrap();

        let opts = DecodingOptions {
            allow_partial_image: false,
            ..Default::default()
        };
        let result = pipeline.decode(&mut source, 0, &opts);
        assert!(matches!(result, Err(ImageError::DataIncomplete(_))));
    }

    #[test]
    fn test_decode_does_not_mutate_source_bytes() {
        let pipeline = scripted_pipeline();
        let mut source = incremental_source();
        let data = vec![7u8; SCRIPT_FULL_AT];
        source.update_data(&data, 0, data.len(), true).unwrap();

        pipeline
            .decode(&mut source, 0, &DecodingOptions::default())
            .unwrap();
        assert_eq!(source.bytes().unwrap(), &data[..]);
        assert_eq!(source.byte_len(), SCRIPT_FULL_AT);
    }
}
