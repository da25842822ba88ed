//! The heap region and every piece of offset arithmetic over it.
//!
//! The heap is one owned, contiguous byte buffer. Allocation bumps a
//! position cursor; objects are addressed by byte offset ([`ObjRef`])
//! and accessed through the typed readers/writers here. No other module
//! computes offsets into the buffer.

use opal_core::{align_up, is_aligned, WORD_SIZE};
use tracing::trace;

use crate::klass::{ClassTag, Klass};
use crate::object::{
    HeapValue, ObjRef, DISPATCH_OFFSET, HEADER_SIZE, MARK_OFFSET, SIZE_OFFSET, TAG_OFFSET,
};

/// Offset of the first object in the region. The word below it is
/// permanently unused so that offset 0 can serve as the null sentinel.
pub const FIRST_OBJECT_OFFSET: usize = WORD_SIZE;

/// Contiguous managed heap with bump allocation.
pub struct Heap {
    buf: Box<[u8]>,
    pos: usize,
}

impl Heap {
    /// Create a heap of `size` bytes. The buffer starts zero-filled.
    pub fn new(size: usize) -> Self {
        assert!(
            size >= FIRST_OBJECT_OFFSET + HEADER_SIZE,
            "heap of {} bytes cannot hold a single object header",
            size
        );
        Self {
            buf: vec![0u8; size].into_boxed_slice(),
            pos: FIRST_OBJECT_OFFSET,
        }
    }

    /// Lowest valid object offset.
    #[inline]
    pub fn start(&self) -> usize {
        FIRST_OBJECT_OFFSET
    }

    /// One past the highest addressable byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.buf.len()
    }

    /// Current bump position: every byte of `[start, pos)` belongs to
    /// exactly one object or filler record.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes consumed by the allocated prefix of the region.
    #[inline]
    pub fn used(&self) -> usize {
        self.pos - FIRST_OBJECT_OFFSET
    }

    /// Bytes still available for bump allocation.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bump-allocate `size` bytes, returning the new record's offset.
    ///
    /// `size` must already be aligned. Returns `None` when the request
    /// does not fit below `end`.
    pub fn bump(&mut self, size: usize) -> Option<ObjRef> {
        debug_assert!(is_aligned(size), "bump of unaligned size {}", size);
        if self.pos + size > self.buf.len() {
            return None;
        }
        let obj = ObjRef::from_offset(self.pos);
        self.pos += size;
        Some(obj)
    }

    // =========================================================================
    // Raw typed access
    // =========================================================================

    #[inline]
    fn slice(&self, at: usize, len: usize) -> &[u8] {
        assert!(
            at + len <= self.buf.len(),
            "heap access [{}, {}) out of bounds (heap size {})",
            at,
            at + len,
            self.buf.len()
        );
        &self.buf[at..at + len]
    }

    #[inline]
    fn slice_mut(&mut self, at: usize, len: usize) -> &mut [u8] {
        assert!(
            at + len <= self.buf.len(),
            "heap access [{}, {}) out of bounds (heap size {})",
            at,
            at + len,
            self.buf.len()
        );
        &mut self.buf[at..at + len]
    }

    /// Read a typed value at `base + offset`.
    #[inline]
    pub fn read<T: HeapValue>(&self, base: ObjRef, offset: usize) -> T {
        T::load(self.slice(base.offset() + offset, T::SIZE))
    }

    /// Write a typed value at `base + offset`.
    #[inline]
    pub fn write<T: HeapValue>(&mut self, base: ObjRef, offset: usize, value: T) {
        value.store(self.slice_mut(base.offset() + offset, T::SIZE));
    }

    /// Borrow `len` raw bytes at `base + offset`.
    #[inline]
    pub fn read_bytes(&self, base: ObjRef, offset: usize, len: usize) -> &[u8] {
        self.slice(base.offset() + offset, len)
    }

    /// Overwrite raw bytes at `base + offset`.
    #[inline]
    pub fn write_bytes(&mut self, base: ObjRef, offset: usize, bytes: &[u8]) {
        self.slice_mut(base.offset() + offset, bytes.len())
            .copy_from_slice(bytes);
    }

    /// Copy `len` bytes from `src + offset` to `dst + offset`.
    ///
    /// Used by the `copy` primitive to duplicate field regions.
    pub fn copy_region(&mut self, src: ObjRef, dst: ObjRef, offset: usize, len: usize) {
        let from = src.offset() + offset;
        let to = dst.offset() + offset;
        assert!(
            from + len <= self.buf.len() && to + len <= self.buf.len(),
            "heap copy out of bounds"
        );
        self.buf.copy_within(from..from + len, to);
    }

    // =========================================================================
    // Object header accessors
    // =========================================================================

    /// Mark bit of the object at `obj`.
    #[inline]
    pub fn mark_of(&self, obj: ObjRef) -> u32 {
        self.read(obj, MARK_OFFSET)
    }

    /// Set the mark bit.
    #[inline]
    pub fn set_mark(&mut self, obj: ObjRef) {
        self.write(obj, MARK_OFFSET, 1u32);
    }

    /// Clear the mark bit.
    #[inline]
    pub fn clear_mark(&mut self, obj: ObjRef) {
        self.write(obj, MARK_OFFSET, 0u32);
    }

    /// Class tag of the object at `obj`.
    #[inline]
    pub fn tag_of(&self, obj: ObjRef) -> ClassTag {
        ClassTag::from_raw(self.read(obj, TAG_OFFSET))
    }

    /// Total byte size of the object at `obj`, header included.
    #[inline]
    pub fn size_of_object(&self, obj: ObjRef) -> usize {
        self.read::<u64>(obj, SIZE_OFFSET) as usize
    }

    /// Class-descriptor handle of the object at `obj`.
    #[inline]
    pub fn dispatch_of(&self, obj: ObjRef) -> ClassTag {
        ClassTag::from_raw(self.read::<u64>(obj, DISPATCH_OFFSET) as u32)
    }

    /// Initialise a fresh header: unmarked, with the given tag, size
    /// and dispatch handle.
    pub fn init_header(&mut self, obj: ObjRef, tag: ClassTag, size: usize, dispatch: ClassTag) {
        debug_assert!(is_aligned(size) && size >= HEADER_SIZE);
        self.write(obj, MARK_OFFSET, 0u32);
        self.write(obj, TAG_OFFSET, tag.raw());
        self.write(obj, SIZE_OFFSET, size as u64);
        self.write(obj, DISPATCH_OFFSET, dispatch.raw() as u64);
    }

    /// Rewrite a reclaimed range as a free filler chunk so linear heap
    /// walks stay exact.
    pub fn write_filler(&mut self, at: usize, size: usize) {
        debug_assert!(is_aligned(at) && is_aligned(size) && size >= HEADER_SIZE);
        let obj = ObjRef::from_offset(at);
        self.init_header(obj, ClassTag::FREE, size, ClassTag::FREE);
        trace!(offset = at, size, "coalesced free chunk");
    }

    // =========================================================================
    // Field access
    // =========================================================================

    /// Offset of the first field slot relative to the heap base.
    #[inline]
    pub fn fields_base(&self, obj: ObjRef) -> usize {
        obj.offset() + HEADER_SIZE
    }

    /// Null-fill every slot between header end and object end.
    ///
    /// Required whenever the slot region may carry stale bytes: chunks
    /// reused from the free list, or heaps configured without
    /// allocation-time zeroing guarantees.
    pub fn zero_fields(&mut self, obj: ObjRef) {
        let size = self.size_of_object(obj);
        let at = obj.offset() + HEADER_SIZE;
        self.slice_mut(at, size - HEADER_SIZE).fill(0);
    }

    /// Read reference field `i` of `obj`.
    #[inline]
    pub fn field(&self, obj: ObjRef, i: usize) -> ObjRef {
        self.read(obj, HEADER_SIZE + i * WORD_SIZE)
    }

    /// Write reference field `i` of `obj`.
    #[inline]
    pub fn set_field(&mut self, obj: ObjRef, i: usize, value: ObjRef) {
        self.write(obj, HEADER_SIZE + i * WORD_SIZE, value);
    }

    // =========================================================================
    // Validity and traversal
    // =========================================================================

    /// Address-validity filter: true when `r` is non-null, aligned and
    /// names a header fully inside the allocated prefix. Slot values
    /// failing this test are ignored by the marker.
    #[inline]
    pub fn is_valid_ref(&self, r: ObjRef) -> bool {
        let off = r.offset();
        !r.is_null()
            && is_aligned(off)
            && off >= FIRST_OBJECT_OFFSET
            && off + HEADER_SIZE <= self.pos
    }

    /// Iterate every record (live objects and free filler) in address
    /// order. The `size` header field is the authoritative stride.
    pub fn objects(&self) -> HeapWalker<'_> {
        HeapWalker {
            heap: self,
            cursor: FIRST_OBJECT_OFFSET,
        }
    }

    /// Walk the allocated prefix asserting every structural invariant:
    /// aligned, non-overlapping records that exactly tile `[start,
    /// pos)`, and field slots that are null or valid references.
    ///
    /// Expensive; intended for debug builds and tests.
    pub fn verify(&self, registry: &crate::klass::KlassRegistry) {
        let mut cursor = FIRST_OBJECT_OFFSET;
        while cursor < self.pos {
            let obj = ObjRef::from_offset(cursor);
            let size = self.size_of_object(obj);
            assert!(
                is_aligned(size) && size >= HEADER_SIZE,
                "corrupt size {} at offset {}",
                size,
                cursor
            );
            assert!(
                cursor + size <= self.pos,
                "object at {} overruns heap position {}",
                cursor,
                self.pos
            );
            let klass = registry
                .get(self.dispatch_of(obj))
                .unwrap_or_else(|| panic!("unregistered class at offset {}", cursor));
            if !klass.is_special() {
                for i in 0..klass.field_count() as usize {
                    let child = self.field(obj, i);
                    assert!(
                        child.is_null() || self.is_valid_ref(child),
                        "field {} of object at {} holds invalid reference {:?}",
                        i,
                        cursor,
                        child
                    );
                }
            }
            cursor += size;
        }
        assert_eq!(cursor, self.pos, "heap records do not tile the region");
    }
}

/// Iterator over every record in the heap, free filler included.
pub struct HeapWalker<'h> {
    heap: &'h Heap,
    cursor: usize,
}

impl Iterator for HeapWalker<'_> {
    type Item = ObjRef;

    fn next(&mut self) -> Option<ObjRef> {
        if self.cursor >= self.heap.pos() {
            return None;
        }
        let obj = ObjRef::from_offset(self.cursor);
        let size = self.heap.size_of_object(obj);
        assert!(
            size >= HEADER_SIZE,
            "corrupt size {} at offset {}",
            size,
            self.cursor
        );
        self.cursor += align_up(size);
        Some(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klass::{Klass, KlassRegistry, MethodTable};

    fn test_klass(reg: &mut KlassRegistry, fields: u16) -> &'static Klass {
        reg.register(Klass::new("Node", fields, MethodTable::new()))
    }

    #[test]
    fn test_bump_advances_pos() {
        let mut heap = Heap::new(256);
        assert_eq!(heap.pos(), FIRST_OBJECT_OFFSET);

        let a = heap.bump(32).unwrap();
        let b = heap.bump(40).unwrap();
        assert_eq!(a.offset(), FIRST_OBJECT_OFFSET);
        assert_eq!(b.offset(), FIRST_OBJECT_OFFSET + 32);
        assert_eq!(heap.used(), 72);
    }

    #[test]
    fn test_bump_refuses_overflow() {
        let mut heap = Heap::new(64);
        assert!(heap.bump(48).is_some());
        assert!(heap.bump(16).is_none());
    }

    #[test]
    fn test_header_round_trip() {
        let mut reg = KlassRegistry::new();
        let k = test_klass(&mut reg, 2);

        let mut heap = Heap::new(256);
        let obj = heap.bump(k.instance_size()).unwrap();
        heap.init_header(obj, k.tag(), k.instance_size(), k.tag());

        assert_eq!(heap.mark_of(obj), 0);
        assert_eq!(heap.tag_of(obj), k.tag());
        assert_eq!(heap.size_of_object(obj), k.instance_size());
        assert_eq!(heap.dispatch_of(obj), k.tag());

        heap.set_mark(obj);
        assert_eq!(heap.mark_of(obj), 1);
        heap.clear_mark(obj);
        assert_eq!(heap.mark_of(obj), 0);
    }

    #[test]
    fn test_zero_fields_and_slots() {
        let mut reg = KlassRegistry::new();
        let k = test_klass(&mut reg, 3);

        let mut heap = Heap::new(256);
        let obj = heap.bump(k.instance_size()).unwrap();
        heap.init_header(obj, k.tag(), k.instance_size(), k.tag());

        heap.set_field(obj, 1, ObjRef::from_offset(64));
        assert_eq!(heap.field(obj, 1), ObjRef::from_offset(64));

        heap.zero_fields(obj);
        for i in 0..3 {
            assert!(heap.field(obj, i).is_null());
        }
    }

    #[test]
    fn test_validity_filter() {
        let mut heap = Heap::new(256);
        let obj = heap.bump(64).unwrap();
        heap.write(obj, SIZE_OFFSET, 64u64);

        assert!(heap.is_valid_ref(obj));
        assert!(!heap.is_valid_ref(ObjRef::NULL));
        // Unaligned.
        assert!(!heap.is_valid_ref(ObjRef::from_offset(13)));
        // Beyond the allocated prefix.
        assert!(!heap.is_valid_ref(ObjRef::from_offset(128)));
    }

    #[test]
    fn test_walker_visits_every_record() {
        let mut reg = KlassRegistry::new();
        let k = test_klass(&mut reg, 1);

        let mut heap = Heap::new(512);
        for _ in 0..4 {
            let obj = heap.bump(k.instance_size()).unwrap();
            heap.init_header(obj, k.tag(), k.instance_size(), k.tag());
        }

        let offsets: Vec<usize> = heap.objects().map(|o| o.offset()).collect();
        assert_eq!(offsets.len(), 4);
        assert_eq!(offsets[0], FIRST_OBJECT_OFFSET);
        for pair in offsets.windows(2) {
            assert_eq!(pair[1] - pair[0], k.instance_size());
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds_read_is_fatal() {
        let heap = Heap::new(64);
        let _: u64 = heap.read(ObjRef::from_offset(60), 8);
    }

    #[test]
    fn test_verify_accepts_consistent_heap() {
        let mut reg = KlassRegistry::new();
        let k = test_klass(&mut reg, 2);

        let mut heap = Heap::new(256);
        let a = heap.bump(k.instance_size()).unwrap();
        heap.init_header(a, k.tag(), k.instance_size(), k.tag());
        heap.zero_fields(a);
        let b = heap.bump(k.instance_size()).unwrap();
        heap.init_header(b, k.tag(), k.instance_size(), k.tag());
        heap.zero_fields(b);
        heap.set_field(a, 0, b);

        heap.verify(&reg);
    }
}
