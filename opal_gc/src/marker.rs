//! Worklist tracing.
//!
//! Single-threaded, stop-the-world marking: walk the root chain, set
//! the mark bit on every unmarked referent, and drain a worklist that
//! carries discovery through object fields. Classes flagged special are
//! leaves; their payload bytes are never interpreted as references.
//!
//! Recursion is forbidden: traversal depth is bounded by the explicit
//! worklist regardless of heap shape.

use tracing::trace;

use crate::heap::Heap;
use crate::klass::{self, KlassRegistry};
use crate::object::ObjRef;
use crate::roots::RootSource;

/// The tracing marker.
pub struct Marker {
    // A LIFO worklist gives depth-first traversal: the objects
    // processed next are those pushed most recently, which are likely
    // still cache-warm (The Garbage Collection Handbook, Jones et al.,
    // ch. 2). FIFO would be equally correct.
    worklist: Vec<ObjRef>,
}

impl Marker {
    /// Create a marker with an empty worklist.
    pub fn new() -> Self {
        Self {
            worklist: Vec::with_capacity(256),
        }
    }

    /// Mark every object reachable from `roots`.
    ///
    /// Returns the number of objects marked. Slot values that fail the
    /// heap's address-validity filter are skipped: precise roots never
    /// produce them, but a conservative source may.
    pub fn mark_from_roots(&mut self, heap: &mut Heap, roots: &mut dyn RootSource) -> usize {
        assert!(
            self.worklist.is_empty(),
            "mark started with a non-empty worklist"
        );

        let registry = klass::registry().read();
        let worklist = &mut self.worklist;
        let mut marked = 0usize;

        roots.visit_roots(&mut |slot| {
            let obj = *slot;
            if !heap.is_valid_ref(obj) || heap.mark_of(obj) != 0 {
                return;
            }
            heap.set_mark(obj);
            trace!(offset = obj.offset(), "marked root");
            worklist.push(obj);
            marked += drain(heap, worklist, &registry);
        });

        marked
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain the worklist, blackening every transitively reachable object.
fn drain(heap: &mut Heap, worklist: &mut Vec<ObjRef>, registry: &KlassRegistry) -> usize {
    let mut marked = 0usize;

    while let Some(obj) = worklist.pop() {
        marked += 1;

        let klass = registry
            .get(heap.dispatch_of(obj))
            .unwrap_or_else(|| panic!("marked object at {} has no class", obj.offset()));

        // Special types carry opaque payload bytes, not references.
        if klass.is_special() {
            continue;
        }

        for i in 0..klass.field_count() as usize {
            let child = heap.field(obj, i);
            if !heap.is_valid_ref(child) || heap.mark_of(child) != 0 {
                continue;
            }
            heap.set_mark(child);
            trace!(offset = child.offset(), "marked");
            worklist.push(child);
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klass::{registry, Klass, MethodTable};
    use crate::roots::ScopeStack;

    fn register(klass: Klass) -> &'static Klass {
        registry().write().register(klass)
    }

    fn alloc(heap: &mut Heap, klass: &Klass) -> ObjRef {
        let obj = heap.bump(klass.instance_size()).unwrap();
        heap.init_header(obj, klass.tag(), klass.instance_size(), klass.tag());
        heap.zero_fields(obj);
        obj
    }

    #[test]
    fn test_marks_transitive_closure() {
        let node = register(Klass::new("MarkNode", 1, MethodTable::new()));
        let mut heap = Heap::new(1024);

        // a -> b -> c, d unreachable
        let a = alloc(&mut heap, node);
        let b = alloc(&mut heap, node);
        let c = alloc(&mut heap, node);
        let d = alloc(&mut heap, node);
        heap.set_field(a, 0, b);
        heap.set_field(b, 0, c);

        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.reg_root(a);

        let marked = Marker::new().mark_from_roots(&mut heap, &mut scopes);
        assert_eq!(marked, 3);
        assert_eq!(heap.mark_of(a), 1);
        assert_eq!(heap.mark_of(b), 1);
        assert_eq!(heap.mark_of(c), 1);
        assert_eq!(heap.mark_of(d), 0);
    }

    #[test]
    fn test_cycle_terminates() {
        let node = register(Klass::new("CycleNode", 2, MethodTable::new()));
        let mut heap = Heap::new(1024);

        let a = alloc(&mut heap, node);
        let b = alloc(&mut heap, node);
        heap.set_field(a, 0, b);
        heap.set_field(b, 0, a);
        heap.set_field(b, 1, b);

        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.reg_root(a);

        let marked = Marker::new().mark_from_roots(&mut heap, &mut scopes);
        assert_eq!(marked, 2);
    }

    #[test]
    fn test_special_payload_not_traced() {
        // Payload words hold values that would pass the validity
        // filter if treated as references.
        let node = register(Klass::new("LeafOwner", 1, MethodTable::new()));
        let blob = register(Klass::special("LeafBlob", 16, MethodTable::new()));
        let mut heap = Heap::new(1024);

        let owner = alloc(&mut heap, node);
        let victim = alloc(&mut heap, node);
        let leaf = alloc(&mut heap, blob);
        heap.set_field(owner, 0, leaf);
        // Forge a would-be reference to `victim` inside the payload.
        heap.write::<u64>(leaf, crate::object::HEADER_SIZE, victim.to_word());

        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.reg_root(owner);

        let marked = Marker::new().mark_from_roots(&mut heap, &mut scopes);
        assert_eq!(marked, 2); // owner + leaf, never victim
        assert_eq!(heap.mark_of(victim), 0);
        // Payload bytes are untouched.
        assert_eq!(
            heap.read::<u64>(leaf, crate::object::HEADER_SIZE),
            victim.to_word()
        );
    }

    #[test]
    fn test_null_and_invalid_slots_ignored() {
        let node = register(Klass::new("SparseNode", 3, MethodTable::new()));
        let mut heap = Heap::new(1024);

        let a = alloc(&mut heap, node);
        // field 0 stays null; field 1 gets a garbage non-heap word.
        heap.write::<u64>(a, crate::object::HEADER_SIZE + 8, 0xFFFF_FFF1);

        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.reg_root(a);

        let marked = Marker::new().mark_from_roots(&mut heap, &mut scopes);
        assert_eq!(marked, 1);
    }

    #[test]
    fn test_marks_every_scope_in_chain() {
        let node = register(Klass::new("ChainNode", 0, MethodTable::new()));
        let mut heap = Heap::new(1024);

        let outer = alloc(&mut heap, node);
        let inner = alloc(&mut heap, node);

        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.reg_root(outer);
        scopes.push_scope();
        scopes.reg_root(inner);

        let marked = Marker::new().mark_from_roots(&mut heap, &mut scopes);
        assert_eq!(marked, 2);
        assert_eq!(heap.mark_of(outer), 1);
        assert_eq!(heap.mark_of(inner), 1);
    }
}
