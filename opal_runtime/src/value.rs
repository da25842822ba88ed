//! Boxed values for the special leaf classes.
//!
//! `Int` and `Bool` carry one payload word after the header; `String`
//! carries a length word followed by raw bytes padded to alignment.
//! The marker never interprets any of it.
//!
//! Allocation here follows the collector-wide contract: out-of-memory
//! is terminal, so these helpers return plain references.

use opal_core::{align_up, WORD_SIZE};
use opal_gc::{fatal_oom, Gc, ObjRef, HEADER_SIZE};

use crate::builtins::{builtins, class_of};

/// Offset of the `Int`/`Bool` payload word.
pub const PAYLOAD_OFFSET: usize = HEADER_SIZE;
/// Offset of the `String` length word.
pub const STRING_LEN_OFFSET: usize = HEADER_SIZE;
/// Offset of the first `String` content byte.
pub const STRING_BYTES_OFFSET: usize = HEADER_SIZE + WORD_SIZE;

/// Allocate a boxed `Int`.
pub fn alloc_int(gc: &mut Gc, value: i64) -> ObjRef {
    let obj = match gc.allocate(builtins().int) {
        Ok(obj) => obj,
        Err(e) => fatal_oom(e),
    };
    gc.write(obj, PAYLOAD_OFFSET, value);
    obj
}

/// Payload of a boxed `Int`.
pub fn int_value(gc: &Gc, obj: ObjRef) -> i64 {
    debug_assert!(std::ptr::eq(class_of(gc, obj), builtins().int));
    gc.read(obj, PAYLOAD_OFFSET)
}

/// Allocate a boxed `Bool`.
pub fn alloc_bool(gc: &mut Gc, value: bool) -> ObjRef {
    let obj = match gc.allocate(builtins().boolean) {
        Ok(obj) => obj,
        Err(e) => fatal_oom(e),
    };
    gc.write(obj, PAYLOAD_OFFSET, value as u64);
    obj
}

/// Payload of a boxed `Bool`.
pub fn bool_value(gc: &Gc, obj: ObjRef) -> bool {
    debug_assert!(std::ptr::eq(class_of(gc, obj), builtins().boolean));
    gc.read::<u64>(obj, PAYLOAD_OFFSET) != 0
}

/// Allocate a `String` holding `content`.
pub fn alloc_string(gc: &mut Gc, content: &str) -> ObjRef {
    alloc_string_bytes(gc, content.as_bytes())
}

/// Allocate a `String` from raw bytes.
pub fn alloc_string_bytes(gc: &mut Gc, bytes: &[u8]) -> ObjRef {
    let size = HEADER_SIZE + WORD_SIZE + align_up(bytes.len());
    let obj = match gc.allocate_sized(builtins().string, size) {
        Ok(obj) => obj,
        Err(e) => fatal_oom(e),
    };
    gc.write(obj, STRING_LEN_OFFSET, bytes.len() as u64);
    if !bytes.is_empty() {
        gc.write_bytes(obj, STRING_BYTES_OFFSET, bytes);
    }
    obj
}

/// Content length of a `String` in bytes.
pub fn string_len(gc: &Gc, obj: ObjRef) -> usize {
    debug_assert!(std::ptr::eq(class_of(gc, obj), builtins().string));
    gc.read::<u64>(obj, STRING_LEN_OFFSET) as usize
}

/// Borrow the content bytes of a `String`.
pub fn string_bytes(gc: &Gc, obj: ObjRef) -> &[u8] {
    let len = string_len(gc, obj);
    gc.read_bytes(obj, STRING_BYTES_OFFSET, len)
}

/// Copy the content of a `String` out as host UTF-8.
pub fn string_value(gc: &Gc, obj: ObjRef) -> String {
    String::from_utf8_lossy(string_bytes(gc, obj)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_gc::{GcConfig, GcVariant};

    fn gc() -> Gc {
        Gc::new(GcConfig::small(GcVariant::MarkSweep, 64 * 1024)).unwrap()
    }

    #[test]
    fn test_int_round_trip() {
        let mut gc = gc();
        gc.push_scope();
        let a = alloc_int(&mut gc, -7);
        let b = alloc_int(&mut gc, i64::MAX);
        assert_eq!(int_value(&gc, a), -7);
        assert_eq!(int_value(&gc, b), i64::MAX);
        gc.pop_scope();
    }

    #[test]
    fn test_bool_round_trip() {
        let mut gc = gc();
        gc.push_scope();
        let t = alloc_bool(&mut gc, true);
        let f = alloc_bool(&mut gc, false);
        assert!(bool_value(&gc, t));
        assert!(!bool_value(&gc, f));
        gc.pop_scope();
    }

    #[test]
    fn test_string_round_trip() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "hello, heap");
        assert_eq!(string_len(&gc, s), 11);
        assert_eq!(string_value(&gc, s), "hello, heap");
        gc.pop_scope();
    }

    #[test]
    fn test_empty_string() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "");
        assert_eq!(string_len(&gc, s), 0);
        assert_eq!(string_value(&gc, s), "");
        gc.pop_scope();
    }

    #[test]
    fn test_string_size_is_aligned() {
        let mut gc = gc();
        gc.push_scope();
        // 13 content bytes round up to the next word boundary.
        let s = alloc_string(&mut gc, "thirteen byte");
        let size = gc.heap().size_of_object(s);
        assert_eq!(size % 8, 0);
        assert!(size >= HEADER_SIZE + WORD_SIZE + 13);
        gc.pop_scope();
    }
}
