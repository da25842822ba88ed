//! Opal runtime library.
//!
//! This crate provides everything compiled Opal programs link against
//! beyond the collector itself:
//! - The built-in class descriptors (`Object`, `Int`, `Bool`,
//!   `String`, `IO`) and their registration
//! - Boxed value helpers for the special leaf types
//! - The `Object`, `String` and `IO` method implementations
//! - Structural equality (`equals`)
//!
//! Allocating routines require their object arguments to be reachable
//! from the active root chain: any of them may trigger a collection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod equals;
pub mod value;

pub use builtins::{builtins, class_of, Builtins};
pub use equals::equals;
