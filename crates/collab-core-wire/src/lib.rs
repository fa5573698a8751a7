#![warn(missing_docs)]
//! Wire format and store interfaces for `collab-core`.
//!
//! # Change serialization
//!
//! A changeset travels as a JSON object holding an ordered op array plus
//! the two length scalars:
//!
//! ```json
//! { "ops": [6, -5, "rope"], "len_before": 11, "len_after": 10 }
//! ```
//!
//! - a positive integer `n` is `Retain(n)`,
//! - a negative integer `-n` is `Delete(n)`,
//! - a string is an insert.
//!
//! All counts are UTF-16 code units, matching `collab-core`'s externally
//! visible unit. Well-formed producers emit fused streams (no zero
//! integers, empty strings or adjacent same-kind elements); the decoder
//! fuses adjacent same-kind elements itself, but rejects zero/empty
//! elements and any payload whose length scalars disagree with its op
//! stream.
//!
//! # Store interfaces
//!
//! [`ContentStore`] and [`HistoryLog`] are the only couplings between the
//! core and the excluded collaborators (transport, persistence). The
//! in-memory implementations here back the integration tests and small
//! tools; production code brings its own.

use collab_core::{ChangeSet, Op};
use serde::{Deserialize, Serialize};

pub mod store;

pub use store::{ContentStore, HistoryLog, MemoryContentStore, MemoryHistoryLog};

/// Errors produced while encoding or decoding wire changes.
#[derive(Debug)]
pub enum WireError {
    /// The payload was not valid JSON for the wire schema.
    Json(serde_json::Error),
    /// An op element is illegal (zero integer, empty string, overflow).
    InvalidElement {
        /// Index of the offending element in the op array.
        index: usize,
        /// Why the element was rejected.
        reason: &'static str,
    },
    /// A length scalar disagrees with the op stream.
    LengthMismatch {
        /// Which scalar disagreed (`"len_before"` or `"len_after"`).
        field: &'static str,
        /// The value derived from the op stream.
        expected: u64,
        /// The value carried by the payload.
        actual: u64,
    },
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Json(err) => write!(f, "invalid wire JSON: {}", err),
            WireError::InvalidElement { index, reason } => {
                write!(f, "invalid op element at index {}: {}", index, reason)
            }
            WireError::LengthMismatch {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} mismatch: op stream implies {}, payload says {}",
                    field, expected, actual
                )
            }
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError::Json(err)
    }
}

/// One element of the wire op array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOp {
    /// Positive = retain, negative = delete.
    Count(i64),
    /// Inserted text.
    Text(String),
}

/// The serialized form of a changeset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChange {
    /// Ordered op elements.
    pub ops: Vec<WireOp>,
    /// Document length before the change, in UTF-16 code units.
    pub len_before: u64,
    /// Document length after the change, in UTF-16 code units.
    pub len_after: u64,
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Encodes a changeset into its wire form.
pub fn encode(change: &ChangeSet) -> WireChange {
    let ops = change
        .ops()
        .iter()
        .map(|op| match op {
            Op::Retain(n) => WireOp::Count(*n as i64),
            Op::Delete(n) => WireOp::Count(-(*n as i64)),
            Op::Insert(text) => WireOp::Text(text.clone()),
        })
        .collect();
    WireChange {
        ops,
        len_before: change.len_before() as u64,
        len_after: change.len_after() as u64,
    }
}

/// Encodes a changeset directly to a JSON string.
pub fn to_json_string(change: &ChangeSet) -> Result<String, WireError> {
    Ok(serde_json::to_string(&encode(change))?)
}

/// Decodes a wire change, fusing adjacent same-kind elements and
/// validating the op stream against both length scalars.
pub fn decode(wire: &WireChange) -> Result<ChangeSet, WireError> {
    let mut consumed: u64 = 0;
    let mut deleted: u64 = 0;
    let mut inserted: u64 = 0;

    for (index, op) in wire.ops.iter().enumerate() {
        match op {
            WireOp::Count(0) => {
                return Err(WireError::InvalidElement {
                    index,
                    reason: "zero-length op",
                });
            }
            WireOp::Count(n) => {
                if *n > 0 {
                    consumed += *n as u64;
                } else {
                    let n = n.unsigned_abs();
                    consumed += n;
                    deleted += n;
                }
            }
            WireOp::Text(text) => {
                if text.is_empty() {
                    return Err(WireError::InvalidElement {
                        index,
                        reason: "empty insert",
                    });
                }
                inserted += utf16_len(text) as u64;
            }
        }
    }

    if consumed != wire.len_before {
        return Err(WireError::LengthMismatch {
            field: "len_before",
            expected: consumed,
            actual: wire.len_before,
        });
    }
    let derived_after = wire.len_before - deleted + inserted;
    if derived_after != wire.len_after {
        return Err(WireError::LengthMismatch {
            field: "len_after",
            expected: derived_after,
            actual: wire.len_after,
        });
    }

    // The builder fuses adjacent same-kind elements as they arrive.
    let mut builder = ChangeSet::builder(wire.len_before as usize);
    for op in &wire.ops {
        builder = match op {
            WireOp::Count(n) if *n > 0 => builder.retain(*n as usize),
            WireOp::Count(n) => builder.delete(n.unsigned_abs() as usize),
            WireOp::Text(text) => builder.insert(text),
        };
    }
    // Coverage was validated above; the builder re-checks it.
    builder.build().map_err(|_| WireError::LengthMismatch {
        field: "len_before",
        expected: consumed,
        actual: wire.len_before,
    })
}

/// Decodes a changeset from a JSON string.
pub fn from_json_str(json: &str) -> Result<ChangeSet, WireError> {
    let wire: WireChange = serde_json::from_str(json)?;
    decode(&wire)
}
