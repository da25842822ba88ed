//! Process-global facade tests.
//!
//! The facade installs one collector per process, so everything here
//! runs inside a single test function; this file is its own test
//! binary and does not share the global with other suites.

use opal_gc::{
    gc_alloc, gc_copy, gc_init, gc_read, gc_shutdown, gc_write, global, registry, GcConfig,
    GcVariant, Klass, MethodTable, ObjRef, HEADER_SIZE,
};

use opal_gc::global::push_scope;

#[test]
fn test_facade_lifecycle() {
    let pair = registry()
        .write()
        .register(Klass::new("FacadePair", 2, MethodTable::new()));
    let blob = registry()
        .write()
        .register(Klass::special("FacadeBlob", 8, MethodTable::new()));

    gc_init(GcConfig::small(GcVariant::MarkSweep, 4096));

    // Scoped allocation through the generated-code entry points.
    {
        let _scope = push_scope();

        let a = gc_alloc(pair.tag());
        let idx = global::reg_root(a);

        let payload = gc_alloc(blob.tag());
        gc_write::<i64>(payload, HEADER_SIZE, 77);
        global::reg_root(payload);

        let a = global::root(idx);
        gc_write(a, HEADER_SIZE, payload);

        // Field loads go through the collector too.
        let read_back: ObjRef = gc_read(a, HEADER_SIZE);
        assert_eq!(read_back, payload);
        assert_eq!(gc_read::<i64>(payload, HEADER_SIZE), 77);

        // The copy primitive preserves class identity and contents.
        let dup = gc_copy(payload);
        assert_ne!(dup, payload);
        assert_eq!(gc_read::<i64>(dup, HEADER_SIZE), 77);

        // Scope discipline holds across a panic (unwinding drops the
        // guard and restores the parent scope).
        let depth_before = global::with_gc(|gc| gc.scope_depth());
        let result = std::panic::catch_unwind(|| {
            let _inner = push_scope();
            panic!("mutator failure");
        });
        assert!(result.is_err());
        assert_eq!(global::with_gc(|gc| gc.scope_depth()), depth_before);
    }

    // The guard popped the outer scope.
    assert_eq!(global::with_gc(|gc| gc.scope_depth()), 0);

    // Teardown prints the statistics summary and is idempotent.
    gc_shutdown();
    gc_shutdown();
}
