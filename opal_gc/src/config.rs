//! Collector configuration.
//!
//! The host fixes two things before any mutator code runs: the
//! collector variant and the heap size. The remaining fields are
//! debugging aids.

use opal_core::{is_aligned, OBJECT_ALIGNMENT};

use crate::heap::FIRST_OBJECT_OFFSET;
use crate::object::HEADER_SIZE;

/// Smallest heap that can hold at least one object header.
pub const MIN_HEAP_SIZE: usize = FIRST_OBJECT_OFFSET + HEADER_SIZE + OBJECT_ALIGNMENT;

/// Collection policy, fixed at initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcVariant {
    /// Never reclaim: `collect()` is a no-op and exhaustion is
    /// immediately terminal. Baseline / debugging variant.
    Zero,
    /// Mark reachable objects, sweep the rest onto a free list.
    MarkSweep,
}

impl std::fmt::Display for GcVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcVariant::Zero => write!(f, "ZeroGC"),
            GcVariant::MarkSweep => write!(f, "MarkSweepGC"),
        }
    }
}

/// Configuration for the collector.
///
/// # Example
///
/// ```ignore
/// use opal_gc::{GcConfig, GcVariant};
///
/// let config = GcConfig {
///     variant: GcVariant::MarkSweep,
///     heap_size: 4 * 1024 * 1024,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Collection policy.
    pub variant: GcVariant,

    /// Heap size in bytes. Must be word-aligned and at least
    /// [`MIN_HEAP_SIZE`]; the heap never grows past it.
    pub heap_size: usize,

    /// Null-fill the field region of every allocation, including
    /// fresh bump allocations that are already zero. Reused free-list
    /// chunks are always zeroed regardless of this flag.
    pub zero_memory: bool,

    /// Re-verify every heap invariant after each collection.
    /// Expensive; on by default only in debug builds.
    pub verify_heap: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            variant: GcVariant::MarkSweep,
            heap_size: 16 * 1024 * 1024, // 16MB
            zero_memory: true,
            verify_heap: cfg!(debug_assertions),
        }
    }
}

impl GcConfig {
    /// A tiny heap for tests and examples.
    pub fn small(variant: GcVariant, heap_size: usize) -> Self {
        Self {
            variant,
            heap_size,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap_size < MIN_HEAP_SIZE {
            return Err(ConfigError::HeapTooSmall {
                requested: self.heap_size,
            });
        }
        if !is_aligned(self.heap_size) {
            return Err(ConfigError::HeapMisaligned {
                requested: self.heap_size,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Heap size cannot hold a single object.
    HeapTooSmall {
        /// The rejected size.
        requested: usize,
    },
    /// Heap size is not word-aligned.
    HeapMisaligned {
        /// The rejected size.
        requested: usize,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::HeapTooSmall { requested } => write!(
                f,
                "heap size {} is below the minimum of {} bytes",
                requested, MIN_HEAP_SIZE
            ),
            ConfigError::HeapMisaligned { requested } => {
                write!(f, "heap size {} is not word-aligned", requested)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
