//! `Object` methods: `abort`, `type_name`, `copy`.

use opal_core::RuntimeError;
use opal_gc::{fatal_oom, Gc, ObjRef};

use crate::builtins::class_of;
use crate::value::alloc_string;

/// `Object.abort`: halt the program, reporting the receiver's class.
///
/// Returns the error the language surfaces; generated code converts it
/// into process termination.
pub fn abort(gc: &Gc, receiver: ObjRef) -> RuntimeError {
    RuntimeError::Abort {
        class_name: class_of(gc, receiver).name().to_string(),
    }
}

/// `Object.type_name`: a fresh `String` naming the receiver's dynamic
/// class.
///
/// Allocates; the receiver must be reachable from the root chain.
pub fn type_name(gc: &mut Gc, receiver: ObjRef) -> ObjRef {
    let name = class_of(gc, receiver).name().to_string();
    alloc_string(gc, &name)
}

/// `Object.copy`: a shallow byte-for-byte duplicate of the receiver.
pub fn copy(gc: &mut Gc, receiver: ObjRef) -> ObjRef {
    match gc.copy(receiver) {
        Ok(obj) => obj,
        Err(e) => fatal_oom(e),
    }
}
