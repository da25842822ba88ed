//! The collector: allocation, collection policy, and the `copy`
//! primitive.
//!
//! Allocation is the only safepoint. When a request does not fit, the
//! collector runs one full cycle and retries; if the request still
//! does not fit, it reports out-of-memory, which the facade treats as
//! terminal. `ZeroGc` skips the cycle and fails immediately.
//!
//! Sweeping is a linear pass over the allocated prefix: survivors get
//! their mark cleared (lazy reset), dead neighbours coalesce into free
//! filler chunks that keep the heap walkable and feed the free list.

mod freelist;

pub use freelist::{Allocation, FreeChunk, FreeList};

use std::time::Instant;

use opal_core::align_up;
use tracing::{debug, trace};

use crate::config::{ConfigError, GcConfig, GcVariant};
use crate::heap::Heap;
use crate::klass::{self, ClassTag, Klass};
use crate::marker::Marker;
use crate::object::{HeapValue, ObjRef, HEADER_SIZE};
use crate::roots::{RootIndex, ScopeStack};
use crate::stats::{GcStats, PhaseTimer};

/// The fixed diagnostic printed when the heap is exhausted.
pub const OOM_MESSAGE: &str = "cannot allocate memory for object!";

/// Errors the collector reports to its host.
///
/// The mutator never sees these: the facade converts them into process
/// termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcError {
    /// The request did not fit even after a full collection cycle.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Total heap size.
        heap_size: usize,
    },
}

impl std::fmt::Display for GcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcError::OutOfMemory {
                requested,
                heap_size,
            } => write!(
                f,
                "cannot allocate {} bytes from a {}-byte heap",
                requested, heap_size
            ),
        }
    }
}

impl std::error::Error for GcError {}

/// The garbage-collected heap: allocator, root scopes, marker and
/// sweep policy behind one handle.
pub struct Gc {
    heap: Heap,
    scopes: ScopeStack,
    marker: Marker,
    free_list: FreeList,
    stats: GcStats,
    config: GcConfig,
    created: Instant,
    collecting: bool,
}

impl Gc {
    /// Create a collector with the given configuration.
    pub fn new(config: GcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            variant = %config.variant,
            heap_size = config.heap_size,
            "collector initialised"
        );
        Ok(Self {
            heap: Heap::new(config.heap_size),
            scopes: ScopeStack::new(),
            marker: Marker::new(),
            free_list: FreeList::new(),
            stats: GcStats::new(),
            config,
            created: Instant::now(),
            collecting: false,
        })
    }

    /// The configured collection policy.
    #[inline]
    pub fn variant(&self) -> GcVariant {
        self.config.variant
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Read access to the heap region.
    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Statistics gathered so far.
    #[inline]
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Bytes occupied by live data: the allocated prefix minus
    /// reclaimed chunks.
    pub fn live_bytes(&self) -> usize {
        self.heap.used() - self.free_list.total_free()
    }

    // =========================================================================
    // Root scopes
    // =========================================================================

    /// Open a root scope. Every reference held across a subsequent
    /// allocation must be registered in it.
    pub fn push_scope(&mut self) {
        self.scopes.push_scope();
    }

    /// Close the innermost root scope.
    pub fn pop_scope(&mut self) {
        self.scopes.pop_scope();
    }

    /// Register `obj` in the innermost scope; returns its slot index.
    pub fn reg_root(&mut self, obj: ObjRef) -> RootIndex {
        self.scopes.reg_root(obj)
    }

    /// Read back a registered root by slot index.
    pub fn root(&self, index: RootIndex) -> ObjRef {
        self.scopes.root(index)
    }

    /// Number of open scopes.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    // =========================================================================
    // Field access
    // =========================================================================

    // All mutator loads and stores route through the collector so a
    // barrier can be inserted here without touching generated code.

    /// Read a typed value at `base + offset`.
    #[inline]
    pub fn read<T: HeapValue>(&self, base: ObjRef, offset: usize) -> T {
        self.heap.read(base, offset)
    }

    /// Write a typed value at `base + offset`.
    #[inline]
    pub fn write<T: HeapValue>(&mut self, base: ObjRef, offset: usize, value: T) {
        self.heap.write(base, offset, value);
    }

    /// Read reference field `i` of `obj`.
    #[inline]
    pub fn field(&self, obj: ObjRef, i: usize) -> ObjRef {
        self.heap.field(obj, i)
    }

    /// Write reference field `i` of `obj`.
    #[inline]
    pub fn set_field(&mut self, obj: ObjRef, i: usize, value: ObjRef) {
        self.heap.set_field(obj, i, value);
    }

    /// Borrow raw bytes at `base + offset`.
    #[inline]
    pub fn read_bytes(&self, base: ObjRef, offset: usize, len: usize) -> &[u8] {
        self.heap.read_bytes(base, offset, len)
    }

    /// Overwrite raw bytes at `base + offset`.
    #[inline]
    pub fn write_bytes(&mut self, base: ObjRef, offset: usize, bytes: &[u8]) {
        self.heap.write_bytes(base, offset, bytes);
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a fresh instance of `klass`.
    pub fn allocate(&mut self, klass: &Klass) -> Result<ObjRef, GcError> {
        self.allocate_sized(klass, klass.instance_size())
    }

    /// Allocate an instance of `klass` with an explicit size, for
    /// variable-sized special classes. `size` includes the header and
    /// must be at least `klass.instance_size()`.
    pub fn allocate_sized(&mut self, klass: &Klass, size: usize) -> Result<ObjRef, GcError> {
        debug_assert!(size >= klass.instance_size());
        let obj = self.allocate_internal(klass.tag(), klass.tag(), size)?;
        trace!(
            offset = obj.offset(),
            size = self.heap.size_of_object(obj),
            class = klass.name(),
            "allocated"
        );
        Ok(obj)
    }

    fn allocate_internal(
        &mut self,
        tag: ClassTag,
        dispatch: ClassTag,
        size: usize,
    ) -> Result<ObjRef, GcError> {
        assert!(
            !self.collecting,
            "allocation during an active collection cycle"
        );
        let timer = PhaseTimer::start();
        let size = align_up(size.max(HEADER_SIZE));

        let obj = match self.try_allocate(tag, dispatch, size) {
            Some(obj) => obj,
            None => {
                // Out of space: run one cycle, then retry once.
                self.collect();
                match self.try_allocate(tag, dispatch, size) {
                    Some(obj) => obj,
                    None => {
                        return Err(GcError::OutOfMemory {
                            requested: size,
                            heap_size: self.config.heap_size,
                        });
                    }
                }
            }
        };

        self.stats.record_allocation(size, timer.stop());
        Ok(obj)
    }

    fn try_allocate(&mut self, tag: ClassTag, dispatch: ClassTag, size: usize) -> Option<ObjRef> {
        // Reclaimed space first, then the bump frontier.
        if let Some(alloc) = self.free_list.allocate(size, HEADER_SIZE) {
            if let Some(rem) = alloc.remainder {
                self.heap.write_filler(rem.offset, rem.size);
            }
            let obj = ObjRef::from_offset(alloc.offset);
            self.heap.init_header(obj, tag, alloc.size, dispatch);
            // Reused chunks carry stale bytes.
            self.heap.zero_fields(obj);
            return Some(obj);
        }

        let obj = self.heap.bump(size)?;
        self.heap.init_header(obj, tag, size, dispatch);
        if self.config.zero_memory {
            self.heap.zero_fields(obj);
        }
        Some(obj)
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Run one collection cycle under the configured policy.
    pub fn collect(&mut self) {
        match self.config.variant {
            GcVariant::Zero => {
                debug!("collection requested; ZeroGC never reclaims");
            }
            GcVariant::MarkSweep => self.mark_sweep(),
        }
    }

    fn mark_sweep(&mut self) {
        assert!(!self.collecting, "collection cycle re-entered");
        self.collecting = true;
        let timer = PhaseTimer::start();

        let marked = self.marker.mark_from_roots(&mut self.heap, &mut self.scopes);
        let (bytes_freed, objects_freed) = self.sweep();

        self.collecting = false;
        let live = self.live_bytes();
        self.stats
            .record_full_gc(timer.stop(), bytes_freed, objects_freed, live);
        debug!(marked, bytes_freed, objects_freed, "full collection finished");

        if self.config.verify_heap {
            self.heap.verify(&klass::registry().read());
        }
    }

    /// Linear sweep of the allocated prefix.
    ///
    /// Survivors get their mark cleared; unmarked objects and existing
    /// filler coalesce into single free chunks. Returns
    /// `(bytes_freed, objects_freed)` counting newly dead objects only.
    fn sweep(&mut self) -> (usize, usize) {
        self.free_list.clear();

        let mut bytes_freed = 0usize;
        let mut objects_freed = 0usize;
        let mut run: Option<(usize, usize)> = None;
        let mut cursor = self.heap.start();

        while cursor < self.heap.pos() {
            let obj = ObjRef::from_offset(cursor);
            let size = self.heap.size_of_object(obj);
            let is_filler = self.heap.tag_of(obj) == ClassTag::FREE;
            let live = !is_filler && self.heap.mark_of(obj) != 0;

            if live {
                // Lazy mark reset: survivors leave the cycle unmarked.
                self.heap.clear_mark(obj);
                if let Some((start, run_size)) = run.take() {
                    self.heap.write_filler(start, run_size);
                    self.free_list.push(start, run_size);
                }
            } else {
                if !is_filler {
                    bytes_freed += size;
                    objects_freed += 1;
                }
                match &mut run {
                    Some((_, run_size)) => *run_size += size,
                    None => run = Some((cursor, size)),
                }
            }

            cursor += size;
        }

        if let Some((start, run_size)) = run {
            self.heap.write_filler(start, run_size);
            self.free_list.push(start, run_size);
        }

        (bytes_freed, objects_freed)
    }

    // =========================================================================
    // Copy primitive
    // =========================================================================

    /// Duplicate `obj` byte-for-byte into a fresh allocation with the
    /// same class identity. Independent of the collection policy.
    pub fn copy(&mut self, obj: ObjRef) -> Result<ObjRef, GcError> {
        assert!(self.heap.is_valid_ref(obj), "copy of invalid reference");

        let tag = self.heap.tag_of(obj);
        let dispatch = self.heap.dispatch_of(obj);
        let size = self.heap.size_of_object(obj);

        // The source must survive the cycle a failed fit triggers; pin
        // it in a private scope for the duration.
        self.scopes.push_scope();
        let idx = self.scopes.reg_root(obj);
        let new_obj = match self.allocate_internal(tag, dispatch, size) {
            Ok(o) => o,
            Err(e) => {
                self.scopes.pop_scope();
                return Err(e);
            }
        };
        let src = self.scopes.root(idx);
        self.scopes.pop_scope();

        let payload = size.min(self.heap.size_of_object(new_obj)) - HEADER_SIZE;
        self.heap.copy_region(src, new_obj, HEADER_SIZE, payload);

        trace!(
            from = src.offset(),
            to = new_obj.offset(),
            size,
            "copied object"
        );
        Ok(new_obj)
    }
}

impl Drop for Gc {
    fn drop(&mut self) {
        self.stats.execution += self.created.elapsed();
        self.stats.print_summary();
    }
}
