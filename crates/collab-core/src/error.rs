//! Typed errors shared by every fallible entry point in the crate.
//!
//! All range-checked operations surface an error to the caller instead of
//! panicking; there are no silent fallbacks. Positions carried in error
//! payloads are in the same unit space as the operation that produced them
//! (chars for rope structural ops, UTF-16 code units for the change algebra).

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kind for every fallible operation in the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An index or position failed a range check.
    OutOfBounds {
        /// Name of the operation that failed (e.g. `"char_at"`).
        op: &'static str,
        /// The position that was provided.
        position: usize,
        /// Minimum valid position (inclusive).
        min: usize,
        /// Maximum valid position (exclusive, or inclusive for insert-style ops).
        max: usize,
    },
    /// A `[start, end)` range was reversed or exceeded the valid maximum.
    InvalidRange {
        /// Name of the operation that failed.
        op: &'static str,
        /// Start of the range.
        start: usize,
        /// End of the range.
        end: usize,
        /// Maximum valid end position.
        valid_max: usize,
    },
    /// An iterator was used before its first step or after exhaustion.
    IteratorState {
        /// Name of the iterator operation that failed.
        op: &'static str,
        /// Why the operation was rejected.
        reason: &'static str,
    },
    /// An input parameter was rejected.
    InvalidInput {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
        /// The offending value, rendered.
        value: String,
    },
    /// A change's base length disagrees with the document it was applied to.
    LengthMismatch {
        /// The length the operation expected.
        expected: usize,
        /// The length that was actually found.
        actual: usize,
    },
    /// A structural invariant of the rope was violated (see [`crate::Rope::validate`]).
    StructuralInvariant {
        /// Description of the first violation found.
        description: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OutOfBounds {
                op,
                position,
                min,
                max,
            } => {
                if max == min {
                    write!(f, "{}: position {} out of bounds (empty rope)", op, position)
                } else {
                    write!(
                        f,
                        "{}: position {} out of bounds (valid range: [{}, {}])",
                        op, position, min, max
                    )
                }
            }
            Error::InvalidRange {
                op,
                start,
                end,
                valid_max,
            } => {
                if start > end {
                    write!(f, "{}: invalid range [{}, {}) (start > end)", op, start, end)
                } else {
                    write!(
                        f,
                        "{}: range [{}, {}) out of bounds (valid range: [0, {}])",
                        op, start, end, valid_max
                    )
                }
            }
            Error::IteratorState { op, reason } => {
                write!(f, "iterator {}: {}", op, reason)
            }
            Error::InvalidInput {
                parameter,
                reason,
                value,
            } => {
                write!(f, "invalid parameter {}: {} ({})", parameter, reason, value)
            }
            Error::LengthMismatch { expected, actual } => {
                write!(
                    f,
                    "length mismatch: expected {} UTF-16 units, got {}",
                    expected, actual
                )
            }
            Error::StructuralInvariant { description } => {
                write!(f, "structural invariant violated: {}", description)
            }
        }
    }
}

impl std::error::Error for Error {}
