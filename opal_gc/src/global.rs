//! Process-global collector facade.
//!
//! Generated code needs a zero-argument call path to the collector, so
//! one `Gc` instance lives behind a process-wide handle: `gc_init`
//! installs it before any mutator code runs, `gc_shutdown` tears it
//! down at process exit (printing the statistics summary). Everything
//! else is a thin forwarding layer.
//!
//! Out-of-memory crosses this boundary as process termination with a
//! fixed diagnostic; the typed [`GcError`] never reaches generated
//! code.

use parking_lot::Mutex;
use std::sync::OnceLock;

use crate::collector::{Gc, GcError, OOM_MESSAGE};
use crate::config::GcConfig;
use crate::klass::{self, ClassTag, Klass};
use crate::object::{HeapValue, ObjRef};
use crate::roots::RootIndex;

static GC: OnceLock<Mutex<Option<Gc>>> = OnceLock::new();

fn cell() -> &'static Mutex<Option<Gc>> {
    GC.get_or_init(|| Mutex::new(None))
}

/// Install the process-wide collector. Must run before any mutator
/// code; initialising twice is a host bug.
pub fn gc_init(config: GcConfig) {
    let gc = match Gc::new(config) {
        Ok(gc) => gc,
        Err(e) => panic!("invalid collector configuration: {}", e),
    };
    let mut guard = cell().lock();
    assert!(guard.is_none(), "collector initialised twice");
    *guard = Some(gc);
}

/// Tear down the process-wide collector, printing the statistics
/// summary. Idempotent.
pub fn gc_shutdown() {
    let gc = cell().lock().take();
    drop(gc);
}

/// Run `f` against the installed collector.
///
/// Panics if `gc_init` has not run; mutator calls before
/// initialisation are a host bug.
pub fn with_gc<R>(f: impl FnOnce(&mut Gc) -> R) -> R {
    let mut guard = cell().lock();
    let gc = guard
        .as_mut()
        .unwrap_or_else(|| panic!("collector used before gc_init"));
    f(gc)
}

/// Terminate the process on heap exhaustion.
pub fn fatal_oom(err: GcError) -> ! {
    eprintln!("{}", OOM_MESSAGE);
    eprintln!("{}", err);
    std::process::exit(1)
}

/// Allocate an instance of the class registered under `tag`.
///
/// This is the entry point generated code emits for `new` expressions.
pub fn gc_alloc(tag: ClassTag) -> ObjRef {
    let klass = klass::lookup(tag)
        .unwrap_or_else(|| panic!("gc_alloc of unregistered class tag {}", tag.raw()));
    gc_alloc_by_class(klass)
}

/// Allocate an instance of `klass`.
pub fn gc_alloc_by_class(klass: &Klass) -> ObjRef {
    match with_gc(|gc| gc.allocate(klass)) {
        Ok(obj) => obj,
        Err(e) => fatal_oom(e),
    }
}

/// Duplicate `obj`, preserving class identity (`Object.copy`).
pub fn gc_copy(obj: ObjRef) -> ObjRef {
    match with_gc(|gc| gc.copy(obj)) {
        Ok(copy) => copy,
        Err(e) => fatal_oom(e),
    }
}

/// Read a typed value at `base + offset` through the collector.
pub fn gc_read<T: HeapValue>(base: ObjRef, offset: usize) -> T {
    with_gc(|gc| gc.read(base, offset))
}

/// Write a typed value at `base + offset` through the collector.
pub fn gc_write<T: HeapValue>(base: ObjRef, offset: usize, value: T) {
    with_gc(|gc| gc.write(base, offset, value));
}

/// Register `obj` in the innermost root scope.
pub fn reg_root(obj: ObjRef) -> RootIndex {
    with_gc(|gc| gc.reg_root(obj))
}

/// Read back a registered root by slot index.
pub fn root(index: RootIndex) -> ObjRef {
    with_gc(|gc| gc.root(index))
}

/// Open a root scope, closed again when the returned guard drops.
///
/// Generated code brackets every function body that may allocate with
/// one of these; the guard guarantees the pop on every exit path.
pub fn push_scope() -> RootScope {
    with_gc(|gc| gc.push_scope());
    RootScope { _priv: () }
}

/// Guard for one root scope; dropping it restores the parent scope.
pub struct RootScope {
    _priv: (),
}

impl Drop for RootScope {
    fn drop(&mut self) {
        // Tolerate teardown order: a guard outliving gc_shutdown has
        // nothing to pop.
        let mut guard = cell().lock();
        if let Some(gc) = guard.as_mut() {
            gc.pop_scope();
        }
    }
}
