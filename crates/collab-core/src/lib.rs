#![warn(missing_docs)]
//! Collab Core - Headless Collaborative Text-Editing Kernel
//!
//! # Overview
//!
//! `collab-core` is the document substrate for a real-time collaborative
//! editor: a persistent rope for the text itself, an operational-transform
//! change algebra over it, and a branching history with savepoints and
//! multi-cursor position mapping. It contains no transport, storage or UI —
//! those integrate through the narrow interfaces in `collab-core-wire`.
//!
//! # Core Features
//!
//! - **Persistent Rope**: immutable balanced tree over UTF-8 text, O(log n)
//!   insert/delete/split/concat with full structural sharing
//! - **Index Maps**: byte ↔ char ↔ UTF-16 ↔ line conversions via cached
//!   subtree summaries
//! - **Change Algebra**: retain/insert/delete changesets with
//!   apply/invert/compose/transform and convergence guarantees
//! - **Multi-Cursor Mapping**: selections carried through edits with six
//!   association modes, batch mapping in O(n + k) for sorted cursors
//! - **Branching History**: revision DAG with undo/redo/branch/time-travel
//!   and nine hook points
//! - **Savepoints**: named snapshots with metadata and content-hash dedup
//! - **Client FSM**: the three-state OT client for transport layers to
//!   drive
//!
//! # Position Units
//!
//! Everything the change algebra, selections and history expose counts in
//! **UTF-16 code units** for wire parity with JavaScript clients; scalars
//! at or above U+10000 count as two units. The rope additionally offers
//! `char` (Unicode scalar) and `byte` spaces with O(log n) converters.
//!
//! # Quick Start
//!
//! ```rust
//! use collab_core::{ChangeSet, History, Rope, Transaction};
//!
//! let doc = Rope::from_text("hello world");
//! let change = ChangeSet::builder(doc.len_utf16())
//!     .retain(6)
//!     .delete(5)
//!     .insert("rope")
//!     .build()
//!     .unwrap();
//!
//! let history = History::new();
//! let edited = change.apply(&doc).unwrap();
//! history.commit(Transaction::new(change), &doc).unwrap();
//! assert_eq!(edited.text(), "hello rope");
//!
//! let undo = history.undo().unwrap();
//! assert_eq!(undo.apply(&edited).unwrap().text(), "hello world");
//! ```
//!
//! # Module Description
//!
//! - [`rope`] - persistent rope tree and builder
//! - [`index`] - semantic space conversions and line utilities
//! - [`iter`] - char/byte/chunk/line/grapheme/word iterators
//! - [`change`] - changesets, transactions and the OT algebra
//! - [`selection`] - ranges, selections and batch position mapping
//! - [`history`] - revision DAG with hooks
//! - [`savepoint`] - snapshot store
//! - [`client`] - client synchronization state machine
//! - [`search`] - literal and regex search over rope content
//!
//! # Concurrency
//!
//! Ropes, changesets, selections and iterators are pure values: share them
//! freely, clone them in O(1). The [`History`] and [`SavepointStore`] are
//! shared mutable collections guarded by reader–writer locks; they never
//! hold a lock across I/O.

pub mod change;
pub mod client;
pub mod error;
pub mod history;
pub mod index;
pub mod iter;
pub mod rope;
pub mod savepoint;
pub mod search;
pub mod selection;

pub use change::{ChangeBuilder, ChangeSet, Op, Transaction};
pub use client::{Client, ClientState};
pub use error::{Error, Result};
pub use history::{
    logger_hook, metrics_hook, validator_hook, History, HistoryMetrics, HistoryStats, HookContext,
    HookFn, HookPoint, Revision, DEFAULT_MAX_REVISIONS,
};
pub use index::LineEnding;
pub use iter::{
    next_word_start, prev_word_start, Bytes, Chars, CharsRev, Chunks, Graphemes, Lines,
    SegmentationMode, WordBoundaries, WordSpan,
};
pub use rope::{LinePolicy, Rope, RopeBuilder, TreeStats};
pub use savepoint::{Savepoint, SavepointMeta, SavepointStore};
pub use search::{contains, find_all, find_next, find_prev, SearchMatch, SearchOptions};
pub use selection::{Assoc, PositionMapper, SelRange, Selection};
