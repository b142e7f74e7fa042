//! Metadata store boundary and the Exif read path.
//!
//! Writing tags back into a container is the job of an external
//! metadata store; the core only drives it through [`MetadataStore`].
//! Reading is done locally with the `exif` parser, which understands
//! both JPEG APP1 segments and TIFF-based RAW containers.

use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::{ImageError, Result};
use crate::source::SourceHandle;

/// Key-value view of an image's embedded metadata, with persistence.
///
/// Implementations may reject individual keys (unknown namespace, bad
/// value syntax); rejection surfaces as a failed read-back rather than
/// an error so batch edits can report partial success.
pub trait MetadataStore {
    /// Current value of `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Stage a value for `key`. Staged values must be visible to `get`
    /// immediately; they reach the backing data on `save`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Persist staged values to the backing data.
    fn save(&mut self) -> Result<()>;
}

/// Read-only Exif view over a source's bytes.
pub struct ExifReader {
    exif: exif::Exif,
}

impl ExifReader {
    /// Parse the Exif segment out of raw container bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = std::io::BufReader::new(Cursor::new(bytes));
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| ImageError::Unsupported(format!("no readable Exif data: {e}")))?;
        Ok(Self { exif })
    }

    /// Parse from a source handle.
    ///
    /// Requires a random-access origin: a forward-only stream is
    /// consumed by decoding and cannot be re-read for metadata.
    pub fn from_source(source: &SourceHandle) -> Result<Self> {
        source.check_released("read metadata")?;
        if !source.supports_random_access() {
            return Err(ImageError::IllegalState(
                "metadata read requires a random-access origin".to_string(),
            ));
        }
        Self::from_bytes(source.bytes()?)
    }

    /// String value of the tag named `key`, e.g. `"Orientation"`.
    pub fn property_string(&self, key: &str) -> Option<String> {
        self.exif
            .fields()
            .find(|field| field.tag.to_string() == key)
            .map(|field| {
                field
                    .display_value()
                    .to_string()
                    .trim_matches('"')
                    .to_string()
            })
    }

    /// Integer value of the tag named `key`, or `default` when the tag
    /// is absent or not numeric.
    pub fn property_int(&self, key: &str, default: i64) -> i64 {
        self.exif
            .fields()
            .find(|field| field.tag.to_string() == key)
            .and_then(|field| field.value.get_uint(0))
            .map(|v| v as i64)
            .unwrap_or(default)
    }
}

/// In-memory metadata store.
///
/// Serves as the staging store for tests and for callers that manage
/// persistence themselves. Keys in `rejected` are silently dropped on
/// `set`, modeling tags the backing container cannot represent.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    values: BTreeMap<String, String>,
    rejected: Vec<String>,
    saves: usize,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a value, as if parsed from the container.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Mark a key as unrepresentable; `set` for it will not stick.
    pub fn rejecting(mut self, key: &str) -> Self {
        self.rejected.push(key.to_string());
        self
    }

    /// Number of times `save` ran.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.rejected.iter().any(|k| k == key) {
            log::debug!("metadata store dropped unrepresentable key {key}");
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}
