//! `String` methods: `length`, `concat`, `substr`.
//!
//! Content is copied out of the heap before any allocation, so a
//! collection triggered mid-routine can never invalidate what these
//! functions are reading.

use opal_core::RuntimeError;
use opal_gc::{Gc, ObjRef};

use crate::value::{alloc_int, alloc_string_bytes, string_bytes, string_len};

/// `String.length`: the content length in bytes, as a boxed `Int`.
///
/// Allocates; the receiver must be reachable from the root chain.
pub fn length(gc: &mut Gc, receiver: ObjRef) -> ObjRef {
    let len = string_len(gc, receiver) as i64;
    alloc_int(gc, len)
}

/// `String.concat`: a fresh string holding `receiver` followed by
/// `other`.
///
/// Allocates; both arguments must be reachable from the root chain.
pub fn concat(gc: &mut Gc, receiver: ObjRef, other: ObjRef) -> ObjRef {
    let mut bytes = string_bytes(gc, receiver).to_vec();
    bytes.extend_from_slice(string_bytes(gc, other));
    alloc_string_bytes(gc, &bytes)
}

/// `String.substr`: the `len` bytes of `receiver` starting at
/// `start`.
///
/// Out-of-range requests are a mutator input error surfaced through
/// the language's exception mechanism.
pub fn substr(
    gc: &mut Gc,
    receiver: ObjRef,
    start: i64,
    len: i64,
) -> Result<ObjRef, RuntimeError> {
    let actual = string_len(gc, receiver);

    let valid = start >= 0
        && len >= 0
        && (start as usize) <= actual
        && (start as usize) + (len as usize) <= actual;
    if !valid {
        return Err(RuntimeError::SubstrOutOfRange {
            start: start.max(0) as usize,
            len: len.max(0) as usize,
            actual,
        });
    }

    let bytes = string_bytes(gc, receiver)[start as usize..(start + len) as usize].to_vec();
    Ok(alloc_string_bytes(gc, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{alloc_string, int_value, string_value};
    use opal_gc::{GcConfig, GcVariant};

    fn gc() -> Gc {
        Gc::new(GcConfig::small(GcVariant::MarkSweep, 64 * 1024)).unwrap()
    }

    #[test]
    fn test_length() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "opal");
        gc.reg_root(s);
        let n = length(&mut gc, s);
        assert_eq!(int_value(&gc, n), 4);
        gc.pop_scope();
    }

    #[test]
    fn test_concat() {
        let mut gc = gc();
        gc.push_scope();
        let a = alloc_string(&mut gc, "mark ");
        gc.reg_root(a);
        let b = alloc_string(&mut gc, "sweep");
        gc.reg_root(b);
        let joined = concat(&mut gc, a, b);
        assert_eq!(string_value(&gc, joined), "mark sweep");
        // Sources are untouched.
        assert_eq!(string_value(&gc, a), "mark ");
        assert_eq!(string_value(&gc, b), "sweep");
        gc.pop_scope();
    }

    #[test]
    fn test_concat_with_empty() {
        let mut gc = gc();
        gc.push_scope();
        let a = alloc_string(&mut gc, "");
        gc.reg_root(a);
        let b = alloc_string(&mut gc, "tail");
        gc.reg_root(b);
        let joined = concat(&mut gc, a, b);
        assert_eq!(string_value(&gc, joined), "tail");
        gc.pop_scope();
    }

    #[test]
    fn test_substr_in_range() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "collector");
        gc.reg_root(s);
        let sub = substr(&mut gc, s, 3, 4).unwrap();
        assert_eq!(string_value(&gc, sub), "lect");
        gc.pop_scope();
    }

    #[test]
    fn test_substr_full_and_empty() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "heap");
        gc.reg_root(s);

        let full = substr(&mut gc, s, 0, 4).unwrap();
        assert_eq!(string_value(&gc, full), "heap");

        let empty = substr(&mut gc, s, 4, 0).unwrap();
        assert_eq!(string_value(&gc, empty), "");
        gc.pop_scope();
    }

    #[test]
    fn test_substr_out_of_range() {
        let mut gc = gc();
        gc.push_scope();
        let s = alloc_string(&mut gc, "heap");
        gc.reg_root(s);

        let err = substr(&mut gc, s, 2, 10).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::SubstrOutOfRange { actual: 4, .. }
        ));

        assert!(substr(&mut gc, s, -1, 1).is_err());
        assert!(substr(&mut gc, s, 0, -1).is_err());
        assert!(substr(&mut gc, s, 5, 0).is_err());
        gc.pop_scope();
    }
}
