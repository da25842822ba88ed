//! Structural equality for the special classes.
//!
//! `equals(a, b)` compares `Int`, `Bool` and `String` by content and
//! everything else by identity, matching the language's `=` operator.

use opal_gc::{Gc, ObjRef};

use crate::builtins::{builtins, class_of};
use crate::value::{string_bytes, PAYLOAD_OFFSET};

/// Language-level equality.
pub fn equals(gc: &Gc, a: ObjRef, b: ObjRef) -> bool {
    // Identity covers aliases and the both-null case.
    if a == b {
        return true;
    }
    if a.is_null() || b.is_null() {
        return false;
    }

    let ka = class_of(gc, a);
    let kb = class_of(gc, b);
    if !std::ptr::eq(ka, kb) {
        return false;
    }

    let b_ = builtins();
    if std::ptr::eq(ka, b_.int) || std::ptr::eq(ka, b_.boolean) {
        gc.read::<u64>(a, PAYLOAD_OFFSET) == gc.read::<u64>(b, PAYLOAD_OFFSET)
    } else if std::ptr::eq(ka, b_.string) {
        string_bytes(gc, a) == string_bytes(gc, b)
    } else {
        // Distinct non-special objects compare by identity only.
        false
    }
}
