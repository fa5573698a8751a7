//! The change algebra: retain/insert/delete sequences over a document.
//!
//! A [`ChangeSet`] describes an edit as an ordered op stream measured in
//! **UTF-16 code units** — the unit JavaScript clients speak, and therefore
//! the unit of every externally visible position in this crate. Scalars in
//! the basic multilingual plane count as one unit, scalars at or above
//! U+10000 as two.
//!
//! The algebra provides [`ChangeSet::apply`], [`ChangeSet::invert`],
//! [`ChangeSet::compose`] and [`ChangeSet::transform`] with the usual OT
//! laws: inverting round-trips, composing associates with application, and
//! transforming concurrent changes converges regardless of application
//! order.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::iter::{next_word_start, prev_word_start};
use crate::rope::Rope;
use crate::selection::{Assoc, Selection};

/// A single edit operation, counted in UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Keep `n` code units unchanged.
    Retain(usize),
    /// Remove `n` code units.
    Delete(usize),
    /// Splice in new text.
    Insert(String),
}

/// UTF-16 code-unit length of `text`.
pub(crate) fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Appends `op` to `ops`, fusing it with the previous op of the same kind
/// and dropping empty ops.
fn fuse_push(ops: &mut Vec<Op>, op: Op) {
    match &op {
        Op::Retain(0) | Op::Delete(0) => return,
        Op::Insert(text) if text.is_empty() => return,
        _ => {}
    }
    let fused = match (ops.last_mut(), &op) {
        (Some(Op::Retain(prev)), Op::Retain(n)) => {
            *prev += n;
            true
        }
        (Some(Op::Delete(prev)), Op::Delete(n)) => {
            *prev += n;
            true
        }
        (Some(Op::Insert(prev)), Op::Insert(text)) => {
            prev.push_str(text);
            true
        }
        _ => false,
    };
    if !fused {
        ops.push(op);
    }
}

/// Splits `text` at `units` UTF-16 code units.
///
/// Fails when the cut would land inside a surrogate pair — a Rust string
/// cannot represent half of one.
fn split_at_utf16(text: &str, units: usize) -> Result<(&str, &str)> {
    let mut acc = 0;
    for (byte, ch) in text.char_indices() {
        if acc == units {
            return Ok(text.split_at(byte));
        }
        if acc > units {
            break;
        }
        acc += ch.len_utf16();
    }
    if acc == units {
        return Ok((text, ""));
    }
    Err(Error::InvalidInput {
        parameter: "ops",
        reason: "operation splits a surrogate pair",
        value: units.to_string(),
    })
}

/// Accumulates ops into a validated [`ChangeSet`].
///
/// Ops are collected optimistically — adjacent same-kind ops are fused and
/// empty ops dropped as they arrive — and the stream is validated against
/// the base length on [`ChangeBuilder::build`].
#[derive(Debug, Clone)]
pub struct ChangeBuilder {
    ops: Vec<Op>,
    len_before: usize,
    consumed: usize,
    inserted: usize,
    deleted: usize,
}

impl ChangeBuilder {
    /// Starts a builder for a document of `len_before` UTF-16 code units.
    pub fn new(len_before: usize) -> Self {
        ChangeBuilder {
            ops: Vec::new(),
            len_before,
            consumed: 0,
            inserted: 0,
            deleted: 0,
        }
    }

    /// Keeps `n` code units.
    pub fn retain(mut self, n: usize) -> Self {
        self.consumed += n;
        fuse_push(&mut self.ops, Op::Retain(n));
        self
    }

    /// Removes `n` code units.
    pub fn delete(mut self, n: usize) -> Self {
        self.consumed += n;
        self.deleted += n;
        fuse_push(&mut self.ops, Op::Delete(n));
        self
    }

    /// Splices in `text`.
    pub fn insert(mut self, text: &str) -> Self {
        self.inserted += utf16_len(text);
        fuse_push(&mut self.ops, Op::Insert(text.to_string()));
        self
    }

    /// Finishes the change, validating that retains and deletes cover the
    /// base length exactly.
    pub fn build(self) -> Result<ChangeSet> {
        if self.consumed != self.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                actual: self.consumed,
            });
        }
        Ok(ChangeSet {
            ops: self.ops,
            len_before: self.len_before,
            len_after: self.len_before - self.deleted + self.inserted,
        })
    }
}

/// An ordered sequence of [`Op`]s transforming a document of `len_before`
/// code units into one of `len_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    ops: Vec<Op>,
    len_before: usize,
    len_after: usize,
}

impl ChangeSet {
    /// Starts a [`ChangeBuilder`] for a document of `len_before` units.
    pub fn builder(len_before: usize) -> ChangeBuilder {
        ChangeBuilder::new(len_before)
    }

    /// The identity change on a document of `len` units.
    pub fn identity(len: usize) -> ChangeSet {
        let ops = if len == 0 { Vec::new() } else { vec![Op::Retain(len)] };
        ChangeSet {
            ops,
            len_before: len,
            len_after: len,
        }
    }

    /// Assembles a change from raw parts, deriving `len_after`. Callers
    /// guarantee the stream is fused and covers `len_before`.
    fn from_parts(ops: Vec<Op>, len_before: usize) -> ChangeSet {
        let mut deleted = 0;
        let mut inserted = 0;
        let mut consumed = 0;
        for op in &ops {
            match op {
                Op::Retain(n) => consumed += n,
                Op::Delete(n) => {
                    consumed += n;
                    deleted += n;
                }
                Op::Insert(text) => inserted += utf16_len(text),
            }
        }
        debug_assert_eq!(consumed, len_before);
        ChangeSet {
            ops,
            len_before,
            len_after: len_before - deleted + inserted,
        }
    }

    /// The op stream.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Document length (UTF-16 units) this change applies to.
    pub fn len_before(&self) -> usize {
        self.len_before
    }

    /// Document length (UTF-16 units) after applying this change.
    pub fn len_after(&self) -> usize {
        self.len_after
    }

    /// Returns `true` if the change has no ops at all.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns `true` if the change only retains (changes nothing).
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Retain(_)))
    }

    /// Applies the change to `rope`, producing a new rope.
    ///
    /// The rope's UTF-16 length must equal [`ChangeSet::len_before`].
    /// The result shares every retained subtree with the input.
    pub fn apply(&self, rope: &Rope) -> Result<Rope> {
        if self.len_before != rope.len_utf16() {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                actual: rope.len_utf16(),
            });
        }
        let mut out = Rope::with_policy("", rope.line_policy());
        let mut pos = 0usize;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    let start = rope.utf16_to_char(pos)?;
                    let end = rope.utf16_to_char(pos + n)?;
                    out = out.concat(&rope.slice_rope(start, end)?);
                    pos += n;
                }
                Op::Delete(n) => {
                    // Validate the boundary even though the text is dropped.
                    rope.utf16_to_char(pos + n)?;
                    pos += n;
                }
                Op::Insert(text) => {
                    out = out.append(text);
                }
            }
        }
        Ok(out)
    }

    /// Builds the inverse change from the pre-change document, such that
    /// `invert(c, r).apply(c.apply(r)) == r`.
    pub fn invert(&self, original: &Rope) -> Result<ChangeSet> {
        if self.len_before != original.len_utf16() {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                actual: original.len_utf16(),
            });
        }
        let mut ops = Vec::with_capacity(self.ops.len());
        let mut pos = 0usize;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    fuse_push(&mut ops, Op::Retain(*n));
                    pos += n;
                }
                Op::Delete(n) => {
                    let start = original.utf16_to_char(pos)?;
                    let end = original.utf16_to_char(pos + n)?;
                    fuse_push(&mut ops, Op::Insert(original.slice(start, end)?));
                    pos += n;
                }
                Op::Insert(text) => {
                    fuse_push(&mut ops, Op::Delete(utf16_len(text)));
                }
            }
        }
        Ok(ChangeSet::from_parts(ops, self.len_after))
    }

    /// Composes `self` then `other` into a single equivalent change:
    /// `compose(a, b).apply(r) == b.apply(a.apply(r))`.
    ///
    /// Requires `self.len_after == other.len_before`.
    pub fn compose(&self, other: &ChangeSet) -> Result<ChangeSet> {
        if self.len_after != other.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_after,
                actual: other.len_before,
            });
        }
        let mut ops = Vec::with_capacity(self.ops.len() + other.ops.len());
        let mut a_iter = self.ops.iter().cloned();
        let mut b_iter = other.ops.iter().cloned();
        let mut a = a_iter.next();
        let mut b = b_iter.next();
        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                // `a` deletions happen regardless of what `b` does later.
                (Some(Op::Delete(n)), rest_b) => {
                    fuse_push(&mut ops, Op::Delete(n));
                    a = a_iter.next();
                    b = rest_b;
                }
                // `b` insertions target the intermediate document and land
                // before anything `a` still has pending.
                (rest_a, Some(Op::Insert(text))) => {
                    fuse_push(&mut ops, Op::Insert(text));
                    a = rest_a;
                    b = b_iter.next();
                }
                (Some(Op::Retain(na)), Some(Op::Retain(nb))) => {
                    let step = na.min(nb);
                    fuse_push(&mut ops, Op::Retain(step));
                    a = advance(na, step, &mut a_iter, Op::Retain);
                    b = advance(nb, step, &mut b_iter, Op::Retain);
                }
                (Some(Op::Retain(na)), Some(Op::Delete(nb))) => {
                    let step = na.min(nb);
                    fuse_push(&mut ops, Op::Delete(step));
                    a = advance(na, step, &mut a_iter, Op::Retain);
                    b = advance(nb, step, &mut b_iter, Op::Delete);
                }
                (Some(Op::Insert(text)), Some(Op::Retain(nb))) => {
                    let units = utf16_len(&text);
                    let step = units.min(nb);
                    let (keep, rest) = split_at_utf16(&text, step)?;
                    fuse_push(&mut ops, Op::Insert(keep.to_string()));
                    a = if rest.is_empty() {
                        a_iter.next()
                    } else {
                        Some(Op::Insert(rest.to_string()))
                    };
                    b = advance(nb, step, &mut b_iter, Op::Retain);
                }
                (Some(Op::Insert(text)), Some(Op::Delete(nb))) => {
                    // The deletion consumes freshly inserted text: both
                    // cancel over the overlap.
                    let units = utf16_len(&text);
                    let step = units.min(nb);
                    let (_, rest) = split_at_utf16(&text, step)?;
                    a = if rest.is_empty() {
                        a_iter.next()
                    } else {
                        Some(Op::Insert(rest.to_string()))
                    };
                    b = advance(nb, step, &mut b_iter, Op::Delete);
                }
                // `b` exhausted: the remaining `a` tail is length-mismatched,
                // which the precondition rules out for retains; inserts were
                // handled above.
                (Some(op_a), None) => {
                    fuse_push(&mut ops, op_a);
                    a = a_iter.next();
                    b = None;
                }
                (None, Some(op_b)) => {
                    fuse_push(&mut ops, op_b);
                    a = None;
                    b = b_iter.next();
                }
            }
        }
        Ok(ChangeSet::from_parts(ops, self.len_before))
    }

    /// Transforms two concurrent changes with equal `len_before` into
    /// `(a', b')` such that `b'.apply(a.apply(r)) == a'.apply(b.apply(r))`.
    ///
    /// Tie-break: when both sides insert at the same position, the left
    /// operand's (`self`'s) text is placed before the right operand's.
    /// This is deterministic and part of the wire contract.
    pub fn transform(&self, other: &ChangeSet) -> Result<(ChangeSet, ChangeSet)> {
        if self.len_before != other.len_before {
            return Err(Error::LengthMismatch {
                expected: self.len_before,
                actual: other.len_before,
            });
        }
        let mut a_ops = Vec::with_capacity(self.ops.len() + other.ops.len());
        let mut b_ops = Vec::with_capacity(self.ops.len() + other.ops.len());
        let mut a_iter = self.ops.iter().cloned();
        let mut b_iter = other.ops.iter().cloned();
        let mut a = a_iter.next();
        let mut b = b_iter.next();
        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                // Left inserts win the position: they land first, and the
                // right side retains over them.
                (Some(Op::Insert(text)), rest_b) => {
                    let units = utf16_len(&text);
                    fuse_push(&mut a_ops, Op::Insert(text));
                    fuse_push(&mut b_ops, Op::Retain(units));
                    a = a_iter.next();
                    b = rest_b;
                }
                (rest_a, Some(Op::Insert(text))) => {
                    let units = utf16_len(&text);
                    fuse_push(&mut b_ops, Op::Insert(text));
                    fuse_push(&mut a_ops, Op::Retain(units));
                    a = rest_a;
                    b = b_iter.next();
                }
                (Some(Op::Retain(na)), Some(Op::Retain(nb))) => {
                    let step = na.min(nb);
                    fuse_push(&mut a_ops, Op::Retain(step));
                    fuse_push(&mut b_ops, Op::Retain(step));
                    a = advance(na, step, &mut a_iter, Op::Retain);
                    b = advance(nb, step, &mut b_iter, Op::Retain);
                }
                (Some(Op::Delete(na)), Some(Op::Delete(nb))) => {
                    // Both sides removed the same text: it is already gone
                    // in either intermediate document.
                    let step = na.min(nb);
                    a = advance(na, step, &mut a_iter, Op::Delete);
                    b = advance(nb, step, &mut b_iter, Op::Delete);
                }
                (Some(Op::Delete(na)), Some(Op::Retain(nb))) => {
                    let step = na.min(nb);
                    fuse_push(&mut a_ops, Op::Delete(step));
                    a = advance(na, step, &mut a_iter, Op::Delete);
                    b = advance(nb, step, &mut b_iter, Op::Retain);
                }
                (Some(Op::Retain(na)), Some(Op::Delete(nb))) => {
                    let step = na.min(nb);
                    fuse_push(&mut b_ops, Op::Delete(step));
                    a = advance(na, step, &mut a_iter, Op::Retain);
                    b = advance(nb, step, &mut b_iter, Op::Delete);
                }
                // Equal base lengths make a one-sided tail impossible for
                // retains/deletes; surface it as a mismatch instead of
                // diverging silently.
                (Some(_), None) | (None, Some(_)) => {
                    return Err(Error::LengthMismatch {
                        expected: self.len_before,
                        actual: other.len_before,
                    });
                }
            }
        }
        let a_prime = ChangeSet::from_parts(a_ops, other.len_after);
        let b_prime = ChangeSet::from_parts(b_ops, self.len_after);
        debug_assert_eq!(a_prime.len_after, b_prime.len_after);
        Ok((a_prime, b_prime))
    }

    /// Maps a single position through the change. See [`Assoc`] for how
    /// positions at insertion points and inside deletions resolve.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_pos_in(None, pos, assoc)
    }

    /// Maps a position, consulting `doc` (the **post-change** document) for
    /// the word-snapping association modes. Without a document the word
    /// modes degrade to their plain counterparts.
    pub fn map_pos_in(&self, doc: Option<&Rope>, pos: usize, assoc: Assoc) -> usize {
        map_from(MapWalk::default(), self, doc, pos, assoc)
    }
}

/// Cursor state of a left-to-right walk over an op stream, used by both the
/// single-position mapper and the streaming batch mapper.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MapWalk {
    /// Index of the next unconsumed op.
    pub idx: usize,
    /// Position in the pre-change document at `idx`.
    pub old_pos: usize,
    /// Position in the post-change document at `idx`.
    pub new_pos: usize,
}

impl MapWalk {
    /// Consumes every op that lies fully before `pos`. The per-position
    /// resolution in [`map_from`] makes identical decisions for these ops,
    /// so advancing here never changes a mapping result.
    pub(crate) fn advance_to(&mut self, change: &ChangeSet, pos: usize) {
        while let Some(op) = change.ops.get(self.idx) {
            match op {
                Op::Retain(n) => {
                    if self.old_pos + n > pos {
                        break;
                    }
                    self.old_pos += n;
                    self.new_pos += n;
                }
                Op::Delete(n) => {
                    if self.old_pos + n > pos {
                        break;
                    }
                    self.old_pos += n;
                }
                Op::Insert(text) => {
                    if self.old_pos >= pos {
                        break;
                    }
                    self.new_pos += utf16_len(text);
                }
            }
            self.idx += 1;
        }
    }
}

/// Resolves `pos` through the ops at and after the walk cursor.
pub(crate) fn map_from(
    walk: MapWalk,
    change: &ChangeSet,
    doc: Option<&Rope>,
    pos: usize,
    assoc: Assoc,
) -> usize {
    let mut old_pos = walk.old_pos;
    let mut new_pos = walk.new_pos;
    for op in &change.ops[walk.idx..] {
        match op {
            Op::Retain(n) => {
                if pos < old_pos + n {
                    return new_pos + (pos - old_pos);
                }
                old_pos += n;
                new_pos += n;
            }
            Op::Delete(n) => {
                if pos < old_pos + n {
                    let offset = pos - old_pos;
                    return match assoc {
                        Assoc::Before | Assoc::After => new_pos,
                        Assoc::BeforeWord => word_snap_prev(doc, new_pos),
                        Assoc::AfterWord => word_snap_next(doc, new_pos),
                        Assoc::BeforeSticky | Assoc::AfterSticky => {
                            (new_pos + offset).min(change.len_after)
                        }
                    };
                }
                old_pos += n;
            }
            Op::Insert(text) => {
                let units = utf16_len(text);
                if pos == old_pos {
                    match assoc {
                        Assoc::Before | Assoc::BeforeSticky => return new_pos,
                        Assoc::BeforeWord => return word_snap_prev(doc, new_pos),
                        Assoc::AfterWord => {
                            return word_snap_next(doc, new_pos + units);
                        }
                        // `After` flows past this insert (and any insert
                        // that follows at the same point).
                        Assoc::After | Assoc::AfterSticky => {}
                    }
                }
                new_pos += units;
            }
        }
    }
    new_pos + pos.saturating_sub(old_pos).min(change.len_after.saturating_sub(new_pos))
}

/// Keeps the unconsumed remainder of a partially processed op, or pulls the
/// next one.
fn advance<I, F>(total: usize, step: usize, iter: &mut I, make: F) -> Option<Op>
where
    I: Iterator<Item = Op>,
    F: Fn(usize) -> Op,
{
    if total > step {
        Some(make(total - step))
    } else {
        iter.next()
    }
}

fn word_snap_prev(doc: Option<&Rope>, new_pos: usize) -> usize {
    let Some(doc) = doc else {
        return new_pos;
    };
    match doc.utf16_to_char(new_pos) {
        Ok(char_pos) => {
            let snapped = prev_word_start(doc, char_pos);
            doc.char_to_utf16(snapped).unwrap_or(new_pos)
        }
        Err(_) => new_pos,
    }
}

fn word_snap_next(doc: Option<&Rope>, new_pos: usize) -> usize {
    let Some(doc) = doc else {
        return new_pos;
    };
    match doc.utf16_to_char(new_pos) {
        Ok(char_pos) => {
            let snapped = next_word_start(doc, char_pos);
            doc.char_to_utf16(snapped).unwrap_or(new_pos)
        }
        Err(_) => new_pos,
    }
}

// ========== Transaction ==========

static TRANSACTION_CLOCK: AtomicU64 = AtomicU64::new(1);

/// An atomic edit: a change plus a monotonic timestamp and an optional
/// selection to restore alongside it.
///
/// Timestamps come from a process-wide counter rather than the wall clock,
/// so the commit order on a history is total even when commits land within
/// one clock tick.
#[derive(Debug, Clone)]
pub struct Transaction {
    change: ChangeSet,
    timestamp: u64,
    selection: Option<Selection>,
}

impl Transaction {
    /// Wraps a change in a transaction, stamping it.
    pub fn new(change: ChangeSet) -> Self {
        Transaction {
            change,
            timestamp: TRANSACTION_CLOCK.fetch_add(1, Ordering::Relaxed),
            selection: None,
        }
    }

    /// Attaches a selection snapshot to the transaction.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// The wrapped change.
    pub fn change(&self) -> &ChangeSet {
        &self.change
    }

    /// Monotonic creation stamp.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The attached selection, if any.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Applies the wrapped change.
    pub fn apply(&self, rope: &Rope) -> Result<Rope> {
        self.change.apply(rope)
    }

    /// Inverts the wrapped change against the pre-change document.
    pub fn invert(&self, original: &Rope) -> Result<Transaction> {
        Ok(Transaction::new(self.change.invert(original)?))
    }

    /// Returns `true` when the transaction changes nothing.
    pub fn is_empty(&self) -> bool {
        self.change.is_empty() || self.change.is_identity()
    }
}
