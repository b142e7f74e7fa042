//! Batched, transactional metadata edits.
//!
//! The editor accumulates property values without touching anything;
//! `apply_to_source` pushes the whole batch through a metadata store,
//! verifying each write by reading it back. Hard failures (released
//! source, an origin that cannot be re-read) travel the error path;
//! soft failures (nothing to apply after a restore, every edit
//! rejected) come back as [`ApplyOutcome::Rejected`] so callers can
//! treat them as data, not exceptions.

use std::collections::BTreeMap;

use crate::error::{ImageError, Result};
use crate::source::SourceHandle;

use super::store::MetadataStore;

/// Why an apply produced no write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The only recorded entry was an invalid (empty) key.
    InvalidKeyOnly,
    /// The editor was restored and nothing was staged afterwards.
    NothingToApply,
    /// Every staged edit failed its read-back verification.
    AllEditsRejected,
}

/// Result of [`ExifPropertyEditor::apply_to_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Edits persisted; carries the post-apply byte size of the
    /// source's backing data.
    Applied(u64),
    Rejected(RejectReason),
}

/// Accumulates property edits for one source.
///
/// Setters are fluent and never fail: an empty key is recorded under an
/// internal sentinel instead of erroring, so a chain of calls stays
/// infallible and the mistake surfaces at apply time.
#[derive(Debug, Default)]
pub struct ExifPropertyEditor {
    pending: BTreeMap<String, String>,
    invalid_key_attempted: bool,
    restored: bool,
}

impl ExifPropertyEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a string-valued property.
    pub fn set_property_string(&mut self, key: &str, value: &str) -> &mut Self {
        if key.is_empty() {
            log::error!("invalid empty key for string property");
            self.invalid_key_attempted = true;
            return self;
        }
        self.pending.insert(key.to_string(), value.to_string());
        self
    }

    /// Stage an integer-valued property.
    pub fn set_property_int(&mut self, key: &str, value: i64) -> &mut Self {
        if key.is_empty() {
            log::error!("invalid empty key for int property");
            self.invalid_key_attempted = true;
            return self;
        }
        self.pending.insert(key.to_string(), value.to_string());
        self
    }

    /// Stage a double-valued property.
    pub fn set_property_double(&mut self, key: &str, value: f64) -> &mut Self {
        if key.is_empty() {
            log::error!("invalid empty key for double property");
            self.invalid_key_attempted = true;
            return self;
        }
        self.pending.insert(key.to_string(), value.to_string());
        self
    }

    /// Drop the pending edit for `key`. An empty key drops the
    /// invalid-key sentinel instead.
    pub fn rollback_property(&mut self, key: &str) -> &mut Self {
        if key.is_empty() {
            self.invalid_key_attempted = false;
        } else {
            self.pending.remove(key);
        }
        self
    }

    /// Drop every pending edit and mark the editor restored. A restored
    /// editor with nothing staged applies to a rejection, not a no-op.
    pub fn restore(&mut self) -> &mut Self {
        self.pending.clear();
        self.invalid_key_attempted = false;
        self.restored = true;
        self
    }

    /// Number of currently staged edits.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply the staged batch against `source` through `store`.
    ///
    /// Each edit is written and immediately read back; edits whose
    /// read-back disagrees are counted as rejected. The batch persists
    /// unless every edit was rejected. On success the returned size is
    /// re-read from the source's origin descriptor, not from the
    /// pre-edit in-memory copy. The staged set clears on any outcome
    /// that is not a hard error.
    pub fn apply_to_source(
        &mut self,
        source: &mut SourceHandle,
        store: &mut dyn MetadataStore,
    ) -> Result<ApplyOutcome> {
        source.check_released("apply_to_source")?;
        if !source.supports_random_access() {
            return Err(ImageError::Io(
                "metadata apply requires a re-readable origin".to_string(),
            ));
        }

        if self.pending.is_empty() {
            if self.invalid_key_attempted {
                log::error!("apply with only an invalid key staged");
                self.invalid_key_attempted = false;
                return Ok(ApplyOutcome::Rejected(RejectReason::InvalidKeyOnly));
            }
            if self.restored {
                return Ok(ApplyOutcome::Rejected(RejectReason::NothingToApply));
            }
            return Ok(ApplyOutcome::Applied(source.refreshed_byte_size()?));
        }

        let batch = std::mem::take(&mut self.pending);
        self.invalid_key_attempted = false;

        let mut rejected = 0usize;
        for (key, value) in &batch {
            store.set(key, value)?;
            let round_trip = store.get(key);
            if round_trip.as_deref() != Some(value.as_str()) {
                log::debug!("property {key} failed read-back verification");
                rejected += 1;
            }
        }
        if rejected == batch.len() {
            log::error!("all {rejected} staged properties were rejected");
            return Ok(ApplyOutcome::Rejected(RejectReason::AllEditsRejected));
        }

        store.save()?;
        source.reload()?;
        Ok(ApplyOutcome::Applied(source.refreshed_byte_size()?))
    }
}
