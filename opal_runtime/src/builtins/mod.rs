//! Built-in classes.
//!
//! The five classes every Opal program starts from. Registration is
//! process-wide and must happen before the compiler registers user
//! classes, so that the tags generated code embeds line up with the
//! registry.

pub mod io;
pub mod object;
pub mod string;

use std::sync::OnceLock;

use opal_core::WORD_SIZE;
use opal_gc::{registry, Gc, Klass, MethodTable, ObjRef};
use tracing::debug;

/// Handles to the built-in class descriptors.
pub struct Builtins {
    /// Root of the class hierarchy.
    pub object: &'static Klass,
    /// Boxed integer; one payload word.
    pub int: &'static Klass,
    /// Boxed boolean; one payload word.
    pub boolean: &'static Klass,
    /// Byte string; length word followed by raw bytes.
    pub string: &'static Klass,
    /// Console input/output.
    pub io: &'static Klass,
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

/// The built-in class descriptors, registering them on first use.
pub fn builtins() -> &'static Builtins {
    BUILTINS.get_or_init(register_builtins)
}

fn register_builtins() -> Builtins {
    let mut reg = registry().write();
    debug!("registering built-in classes");
    Builtins {
        object: reg.register(Klass::new(
            "Object",
            0,
            MethodTable::from_names(&["abort", "type_name", "copy"]),
        )),
        int: reg.register(Klass::special("Int", WORD_SIZE, MethodTable::new())),
        boolean: reg.register(Klass::special("Bool", WORD_SIZE, MethodTable::new())),
        string: reg.register(Klass::special(
            "String",
            WORD_SIZE,
            MethodTable::from_names(&["length", "concat", "substr"]),
        )),
        io: reg.register(Klass::new(
            "IO",
            0,
            MethodTable::from_names(&["out_string", "out_int", "in_string", "in_int"]),
        )),
    }
}

/// Class descriptor of a live object.
///
/// Panics on an unregistered dispatch handle; a header naming a class
/// the registry does not know is heap corruption.
pub fn class_of(gc: &Gc, obj: ObjRef) -> &'static Klass {
    let dispatch = gc.heap().dispatch_of(obj);
    opal_gc::lookup(dispatch).unwrap_or_else(|| {
        panic!(
            "object at {} carries unregistered class tag {}",
            obj.offset(),
            dispatch.raw()
        )
    })
}
