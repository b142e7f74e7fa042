//! Allocator policy: choosing a backing store and resolving the
//! destination pixel format for a decode.

use crate::common::{AllocatorKind, AlphaType, MemoryUsagePreference, PixelFormat};

/// Backing store actually selected for a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingStore {
    Heap,
    SharedMemory,
}

/// Result of a policy decision: where the bytes live and which format
/// they use, after any memory-pressure downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub backing: BackingStore,
    pub format: PixelFormat,
}

/// Chooses a backing store and destination format for decode output.
///
/// The allocator itself is an external collaborator; this policy only
/// decides what to ask it for. Shared memory may be unavailable in a
/// given process, in which case requests for it quietly land on the
/// heap -- the fallback is not an error.
#[derive(Debug, Clone)]
pub struct AllocatorPolicy {
    shared_memory_available: bool,
}

impl Default for AllocatorPolicy {
    fn default() -> Self {
        Self {
            shared_memory_available: false,
        }
    }
}

impl AllocatorPolicy {
    pub fn new(shared_memory_available: bool) -> Self {
        Self {
            shared_memory_available,
        }
    }

    /// Resolve the caller's allocator hint and format request.
    ///
    /// Rules, in order:
    /// - An explicitly requested pixel format is honored verbatim.
    /// - Under [`MemoryUsagePreference::LowRam`] an unspecified format
    ///   resolves to RGB 565 when the image is opaque, halving memory.
    /// - Any image that needs an alpha channel keeps ARGB 8888.
    pub fn select(
        &self,
        requested: AllocatorKind,
        preference: MemoryUsagePreference,
        format: PixelFormat,
        alpha: AlphaType,
    ) -> Selection {
        let resolved_format = if format != PixelFormat::Unknown {
            format
        } else if preference == MemoryUsagePreference::LowRam && alpha == AlphaType::Opaque {
            PixelFormat::Rgb565
        } else {
            PixelFormat::Argb8888
        };

        let backing = match requested {
            AllocatorKind::SharedMemory if self.shared_memory_available => BackingStore::SharedMemory,
            AllocatorKind::SharedMemory => {
                log::debug!("shared memory unavailable, falling back to heap");
                BackingStore::Heap
            }
            AllocatorKind::Heap | AllocatorKind::Default => BackingStore::Heap,
        };

        Selection {
            backing,
            format: resolved_format,
        }
    }
}
