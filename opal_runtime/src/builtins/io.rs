//! `IO` methods: `out_string`, `out_int`, `in_string`, `in_int`.
//!
//! Streams are passed in explicitly so the routines run against
//! stdin/stdout in generated programs and against in-memory buffers in
//! tests.

use std::io::{BufRead, Write};

use opal_core::RuntimeError;
use opal_gc::{Gc, ObjRef};

use crate::value::{alloc_string, int_value, string_bytes};

/// `IO.out_string`: write the receiver string's bytes to `out`.
pub fn out_string(gc: &Gc, out: &mut dyn Write, s: ObjRef) -> Result<(), RuntimeError> {
    out.write_all(string_bytes(gc, s))?;
    Ok(())
}

/// `IO.out_int`: write the decimal rendering of a boxed `Int` to
/// `out`.
pub fn out_int(gc: &Gc, out: &mut dyn Write, i: ObjRef) -> Result<(), RuntimeError> {
    write!(out, "{}", int_value(gc, i))?;
    Ok(())
}

/// `IO.in_string`: read one line from `input`, without the trailing
/// newline. End of input yields the empty string.
pub fn in_string(gc: &mut Gc, input: &mut dyn BufRead) -> Result<ObjRef, RuntimeError> {
    let line = read_trimmed_line(input)?;
    Ok(alloc_string(gc, &line))
}

/// `IO.in_int`: read one line from `input` and parse it as an
/// integer. A line that does not parse is a mutator input error.
pub fn in_int(gc: &mut Gc, input: &mut dyn BufRead) -> Result<ObjRef, RuntimeError> {
    let line = read_trimmed_line(input)?;
    let value: i64 = line
        .trim()
        .parse()
        .map_err(|_| RuntimeError::IntParse { input: line })?;
    Ok(crate::value::alloc_int(gc, value))
}

fn read_trimmed_line(input: &mut dyn BufRead) -> Result<String, RuntimeError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}
