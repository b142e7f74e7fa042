//! Decode event protocol.
//!
//! Events fire synchronously inside the decode call, on the caller's
//! thread, to at most one observer per source handle. The header event
//! always comes first; a single decode call then ends with either a
//! partial or a complete event, never both.

use crate::common::{ImageInfo, MemoryUsagePreference};

/// Stages of a decode reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEvent {
    /// Header resolved; `ImageInfo` is now populated.
    HeaderDecoded,
    /// Decoding stopped early on truncated data (partial allowed).
    PartialDecoded,
    /// The frame decoded fully.
    CompleteDecoded,
}

/// Mutable per-decode state an observer is allowed to influence.
///
/// Only the memory usage preference is exposed, and only the header
/// event is early enough for a change to affect the current decode.
#[derive(Debug, Default)]
pub struct DecodeControl {
    preference: Option<MemoryUsagePreference>,
}

impl DecodeControl {
    pub fn set_memory_usage_preference(&mut self, preference: MemoryUsagePreference) {
        self.preference = Some(preference);
    }

    pub(crate) fn take_preference(&mut self) -> Option<MemoryUsagePreference> {
        self.preference.take()
    }
}

/// Receiver for decode progress events.
pub trait DecodeObserver {
    /// Called for each stage of a decode. `info` is the pipeline's best
    /// current knowledge of the image.
    fn on_decode_event(&mut self, event: DecodeEvent, info: &ImageInfo, control: &mut DecodeControl);
}

/// Token identifying one observer registration on a source handle.
///
/// Cancelling with a stale token (the registration was already replaced
/// by a newer observer) is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverToken(pub(crate) u64);
