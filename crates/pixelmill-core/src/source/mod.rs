//! Source handles: where encoded image bytes come from.
//!
//! A [`SourceHandle`] wraps one of five origins -- a byte range, a
//! forward-only reader, a file path, an open file, or an append-only
//! incremental buffer -- and tracks how many bytes have accumulated and
//! whether the data is complete. The decode pipeline reads from the
//! handle; it never mutates it beyond draining a forward-only reader.
//!
//! Origins split into random-access kinds (bytes, path, file,
//! incremental) and forward-only kinds (reader). Metadata operations
//! that must re-read the origin are only possible on the former.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::MemoryUsagePreference;
use crate::decode::events::{DecodeObserver, ObserverToken};
use crate::error::{ImageError, Result};

/// How `update_data` treats each chunk on an incremental handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Every update carries the full data received so far; each call
    /// replaces the accumulated buffer.
    #[default]
    FullData,
    /// Every update carries only the new bytes; each call appends.
    IncrementalData,
}

/// Options common to every source kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// MIME-style hint for the container format, e.g. `"image/png"`.
    /// Purely advisory; probing always inspects the bytes.
    pub format_hint: String,
    /// Density the encoded image was authored for. Zero means unknown.
    pub base_density: i32,
}

/// Options for creating an incremental source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalSourceOptions {
    pub opts: SourceOptions,
    pub mode: UpdateMode,
}

enum Origin {
    Bytes,
    Reader,
    Path(PathBuf),
    File { file: fs::File, start: u64 },
    Incremental { mode: UpdateMode },
}

impl std::fmt::Debug for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Bytes => write!(f, "Bytes"),
            Origin::Reader => write!(f, "Reader"),
            Origin::Path(p) => write!(f, "Path({})", p.display()),
            Origin::File { start, .. } => write!(f, "File(start={start})"),
            Origin::Incremental { mode } => write!(f, "Incremental({mode:?})"),
        }
    }
}

/// Origin of encoded bytes plus the accumulated data for decoding.
pub struct SourceHandle {
    origin: Origin,
    options: SourceOptions,
    data: Vec<u8>,
    complete: bool,
    released: bool,
    preference: MemoryUsagePreference,
    observer: Option<Box<dyn DecodeObserver>>,
    observer_token: u64,
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("origin", &self.origin)
            .field("bytes", &self.data.len())
            .field("complete", &self.complete)
            .field("released", &self.released)
            .finish()
    }
}

impl SourceHandle {
    /// Create a handle over a full byte slice. The bytes are copied.
    pub fn from_bytes(data: &[u8], options: SourceOptions) -> Result<Self> {
        Self::from_bytes_range(data, 0, data.len(), options)
    }

    /// Create a handle over `data[offset..offset + length]`.
    pub fn from_bytes_range(
        data: &[u8],
        offset: usize,
        length: usize,
        options: SourceOptions,
    ) -> Result<Self> {
        check_range(data.len(), offset, length)?;
        Ok(Self::new(
            Origin::Bytes,
            options,
            data[offset..offset + length].to_vec(),
            true,
        ))
    }

    /// Create a handle over a forward-only reader.
    ///
    /// The reader is drained immediately; afterwards the origin cannot
    /// be re-read, so metadata operations on this handle fail.
    pub fn from_reader<R: Read>(mut reader: R, options: SourceOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| ImageError::Io(format!("reading source stream: {e}")))?;
        Ok(Self::new(Origin::Reader, options, data, true))
    }

    /// Create a handle over a file path.
    pub fn from_path<P: AsRef<Path>>(path: P, options: SourceOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ImageError::InvalidArgument("path is empty".to_string()));
        }
        let data = fs::read(path)
            .map_err(|e| ImageError::Io(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self::new(Origin::Path(path.to_path_buf()), options, data, true))
    }

    /// Create a handle over an open file, reading from its current
    /// position. The file stays owned by the handle for later re-reads.
    pub fn from_file(mut file: fs::File, options: SourceOptions) -> Result<Self> {
        let start = file
            .stream_position()
            .map_err(|e| ImageError::Io(format!("querying file position: {e}")))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| ImageError::Io(format!("reading source file: {e}")))?;
        Ok(Self::new(Origin::File { file, start }, options, data, true))
    }

    /// Create an empty incremental handle fed through
    /// [`update_data`](Self::update_data).
    pub fn incremental(options: IncrementalSourceOptions) -> Self {
        Self::new(
            Origin::Incremental { mode: options.mode },
            options.opts,
            Vec::new(),
            false,
        )
    }

    fn new(origin: Origin, options: SourceOptions, data: Vec<u8>, complete: bool) -> Self {
        Self {
            origin,
            options,
            data,
            complete,
            released: false,
            preference: MemoryUsagePreference::Default,
            observer: None,
            observer_token: 0,
        }
    }

    /// Feed bytes to an incremental handle.
    ///
    /// In [`UpdateMode::IncrementalData`] the chunk is appended; in
    /// [`UpdateMode::FullData`] it replaces the whole accumulated buffer
    /// and is still accepted after completion (each later call simply
    /// re-describes the full data).
    pub fn update_data(&mut self, data: &[u8], offset: usize, length: usize, is_final: bool) -> Result<()> {
        self.check_released("update_data")?;
        check_range(data.len(), offset, length)?;
        let mode = match &self.origin {
            Origin::Incremental { mode } => *mode,
            _ => {
                return Err(ImageError::IllegalState(
                    "update_data on a non-incremental source".to_string(),
                ));
            }
        };
        let chunk = &data[offset..offset + length];
        match mode {
            UpdateMode::FullData => {
                self.data.clear();
                self.data.extend_from_slice(chunk);
            }
            UpdateMode::IncrementalData => {
                if self.complete {
                    return Err(ImageError::IllegalState(
                        "incremental source already marked final".to_string(),
                    ));
                }
                self.data.extend_from_slice(chunk);
            }
        }
        if is_final {
            self.complete = true;
        }
        Ok(())
    }

    /// All bytes accumulated so far.
    pub fn bytes(&self) -> Result<&[u8]> {
        self.check_released("bytes")?;
        Ok(&self.data)
    }

    /// Whether the accumulated bytes are known to be the whole image.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of bytes accumulated so far.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// True when the origin can be read again from the start: a byte
    /// buffer with known bounds, a path, a seekable file, or the
    /// incremental buffer itself. Forward-only readers cannot.
    pub fn supports_random_access(&self) -> bool {
        !matches!(self.origin, Origin::Reader)
    }

    /// Size of the backing data as the origin reports it right now.
    ///
    /// Re-reads the origin descriptor rather than trusting the in-memory
    /// copy, so a just-rewritten file reports its new size.
    pub fn refreshed_byte_size(&mut self) -> Result<u64> {
        self.check_released("refreshed_byte_size")?;
        match &mut self.origin {
            Origin::Bytes | Origin::Incremental { .. } => Ok(self.data.len() as u64),
            Origin::Path(path) => {
                let meta = fs::metadata(&path)
                    .map_err(|e| ImageError::Io(format!("cannot stat {}: {e}", path.display())))?;
                Ok(meta.len())
            }
            Origin::File { file, start } => {
                let len = file
                    .metadata()
                    .map_err(|e| ImageError::Io(format!("cannot stat source file: {e}")))?
                    .len();
                Ok(len.saturating_sub(*start))
            }
            Origin::Reader => Err(ImageError::Io(
                "forward-only stream cannot be re-read".to_string(),
            )),
        }
    }

    /// Reload the accumulated bytes from the origin descriptor.
    ///
    /// Used after an external rewrite of the backing data (e.g. a
    /// metadata apply). Only random-access origins support this.
    pub fn reload(&mut self) -> Result<()> {
        self.check_released("reload")?;
        match &mut self.origin {
            Origin::Bytes | Origin::Incremental { .. } => Ok(()),
            Origin::Path(path) => {
                self.data = fs::read(&path)
                    .map_err(|e| ImageError::Io(format!("cannot re-read {}: {e}", path.display())))?;
                Ok(())
            }
            Origin::File { file, start } => {
                file.seek(SeekFrom::Start(*start))
                    .map_err(|e| ImageError::Io(format!("cannot seek source file: {e}")))?;
                self.data.clear();
                file.read_to_end(&mut self.data)
                    .map_err(|e| ImageError::Io(format!("cannot re-read source file: {e}")))?;
                Ok(())
            }
            Origin::Reader => Err(ImageError::IllegalState(
                "forward-only stream cannot be reloaded".to_string(),
            )),
        }
    }

    /// String value of an embedded metadata tag, e.g. `"Orientation"`.
    ///
    /// Requires a random-access origin; see
    /// [`supports_random_access`](Self::supports_random_access).
    pub fn image_property_string(&self, key: &str) -> Result<Option<String>> {
        let reader = crate::exif::ExifReader::from_source(self)?;
        Ok(reader.property_string(key))
    }

    /// Integer value of an embedded metadata tag, or `default` when the
    /// tag is absent or not numeric.
    pub fn image_property_int(&self, key: &str, default: i64) -> Result<i64> {
        let reader = crate::exif::ExifReader::from_source(self)?;
        Ok(reader.property_int(key, default))
    }

    /// Memory preference consulted by the next decode on this handle.
    pub fn memory_usage_preference(&self) -> MemoryUsagePreference {
        self.preference
    }

    pub fn set_memory_usage_preference(&mut self, preference: MemoryUsagePreference) {
        self.preference = preference;
    }

    /// Register the decode observer for this handle, replacing any
    /// previous registration (last writer wins). The returned token
    /// cancels only the registration it belongs to.
    pub fn set_decode_observer(&mut self, observer: Box<dyn DecodeObserver>) -> ObserverToken {
        self.observer_token += 1;
        self.observer = Some(observer);
        ObserverToken(self.observer_token)
    }

    /// Remove the observer if `token` still identifies the current
    /// registration. Stale tokens are ignored.
    pub fn cancel_decode_observer(&mut self, token: ObserverToken) {
        if token.0 == self.observer_token {
            self.observer = None;
        }
    }

    pub(crate) fn take_observer(&mut self) -> Option<Box<dyn DecodeObserver>> {
        self.observer.take()
    }

    pub(crate) fn put_observer(&mut self, observer: Box<dyn DecodeObserver>) {
        // Keep a replacement registered mid-decode; the taken observer
        // is simply dropped in that case.
        if self.observer.is_none() {
            self.observer = Some(observer);
        }
    }

    /// Release the handle. Idempotent; every other operation afterwards
    /// fails with an illegal-state error.
    pub fn release(&mut self) {
        self.released = true;
        self.data = Vec::new();
        self.observer = None;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn check_released(&self, op: &str) -> Result<()> {
        if self.released {
            log::error!("{op} on released source handle");
            return Err(ImageError::IllegalState(format!("{op} on a released source handle")));
        }
        Ok(())
    }
}

fn check_range(len: usize, offset: usize, length: usize) -> Result<()> {
    if offset >= len || offset.checked_add(length).map_or(true, |end| end > len) {
        return Err(ImageError::OutOfBounds(format!(
            "offset {offset} / length {length} invalid for {len} bytes"
        )));
    }
    Ok(())
}
