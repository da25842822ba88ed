//! Runtime errors surfaced to generated code.
//!
//! These are mutator-level failures (bad `substr` bounds, unparsable
//! input, an explicit `abort`) that the language surfaces through its
//! exception mechanism. Heap exhaustion and collector invariant
//! violations are *not* represented here: the collector terminates the
//! process for those.

use std::fmt;

/// An error raised by a runtime library routine on behalf of the mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `Object.abort` was invoked; carries the class name of the receiver.
    Abort {
        /// Dynamic class name of the object that aborted.
        class_name: String,
    },
    /// `String.substr` was called with a range outside the receiver.
    SubstrOutOfRange {
        /// Requested start index.
        start: usize,
        /// Requested substring length.
        len: usize,
        /// Actual length of the receiver.
        actual: usize,
    },
    /// `IO.in_int` read a line that does not parse as an integer.
    IntParse {
        /// The offending input line.
        input: String,
    },
    /// An IO routine failed at the stream level.
    Io {
        /// Human-readable description from the underlying stream.
        message: String,
    },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Abort { class_name } => {
                write!(f, "Abort called from class {}", class_name)
            }
            RuntimeError::SubstrOutOfRange { start, len, actual } => {
                write!(
                    f,
                    "substr({}, {}) out of range for string of length {}",
                    start, len, actual
                )
            }
            RuntimeError::IntParse { input } => {
                write!(f, "cannot parse integer from input: {:?}", input)
            }
            RuntimeError::Io { message } => write!(f, "io error: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_display() {
        let err = RuntimeError::Abort {
            class_name: "Main".to_string(),
        };
        assert_eq!(err.to_string(), "Abort called from class Main");
    }

    #[test]
    fn test_substr_display() {
        let err = RuntimeError::SubstrOutOfRange {
            start: 4,
            len: 10,
            actual: 5,
        };
        assert!(err.to_string().contains("substr(4, 10)"));
        assert!(err.to_string().contains("length 5"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: RuntimeError = io.into();
        assert!(matches!(err, RuntimeError::Io { .. }));
    }
}
