//! Opal Garbage Collector
//!
//! The managed object heap used by compiled Opal programs.
//!
//! # Architecture
//!
//! The heap is a single contiguous byte region owned by the collector.
//! Objects are laid out as a fixed binary header followed by word-sized
//! field slots; references between objects are byte offsets into the
//! region, never raw pointers, so all address arithmetic lives in one
//! module ([`heap`]).
//!
//! Collection is stop-the-world mark-sweep:
//!
//! - **Roots**: the mutator maintains a stack of [`roots::RootScope`]
//!   records; every reference that must survive an allocation is
//!   registered in the active scope before the allocation and re-read
//!   through its slot index afterwards.
//! - **Marking**: a worklist-based tracer blackens everything reachable
//!   from the scope chain ([`marker`]).
//! - **Sweeping**: a linear pass coalesces dead objects into free filler
//!   chunks that later allocations reuse ([`collector`]).
//!
//! The collector only runs inside `allocate`; the mutator and collector
//! share one thread, so the core data structures need no locks or
//! atomics. The variant (`ZeroGc` = never reclaim, `MarkSweepGc`) is
//! fixed when the collector is created.
//!
//! # Usage
//!
//! ```ignore
//! use opal_gc::{Gc, GcConfig};
//!
//! let mut gc = Gc::new(GcConfig::default())?;
//! gc.push_scope();
//! let obj = gc.allocate(klass)?;
//! let idx = gc.reg_root(obj);
//! // ... allocations that may collect ...
//! let obj = gc.root(idx);
//! gc.pop_scope();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod global;
pub mod heap;
pub mod klass;
pub mod marker;
pub mod object;
pub mod roots;
pub mod stats;

// Re-exports for convenient access
pub use collector::{Gc, GcError, OOM_MESSAGE};
pub use config::{ConfigError, GcConfig, GcVariant};
pub use global::{
    fatal_oom, gc_alloc, gc_alloc_by_class, gc_copy, gc_init, gc_read, gc_shutdown, gc_write,
    push_scope, reg_root, root, with_gc, RootScope,
};
pub use heap::Heap;
pub use klass::{lookup, registry, ClassTag, Klass, KlassRegistry, MethodTable};
pub use marker::Marker;
pub use object::{HeapValue, ObjRef, HEADER_SIZE};
pub use roots::{RootSource, ScopeStack, ShadowStack};
pub use stats::{GcStats, PhaseTimer};
