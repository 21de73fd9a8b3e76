//! Error type of the crate.

use thiserror::Error;

/// Errors that can occur while constructing or applying the operators.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid construction parameters or mode strings.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Length mismatch between a vector and the operator it is applied to.
    #[error("dimension mismatch in {context}: got {got}, expected {expected}")]
    Dimension {
        context: &'static str,
        got: usize,
        expected: usize,
    },

    /// A packed coefficient vector can not be split into equal blocks.
    #[error("can not split {len} coefficients into {blocks} non-empty blocks")]
    Shape { len: usize, blocks: usize },

    /// The endpoints of a great-circle path do not define a unique arc.
    #[error("degenerate great-circle path from {start:?} to {stop:?}")]
    DegeneratePath { start: (f64, f64), stop: (f64, f64) },

    /// The requested operation is not defined for this variant.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Malformed text input.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Cached payload could not be decoded.
    #[error("corrupt cache entry: {0}")]
    Cache(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Checks that a vector has the expected length.
    pub(crate) fn check_len(context: &'static str, got: usize, expected: usize) -> Result<(), Self> {
        if got == expected {
            Ok(())
        } else {
            Err(Error::Dimension {
                context,
                got,
                expected,
            })
        }
    }
}
