//! Multi-cursor selections and position mapping through changes.
//!
//! A [`Selection`] is a non-empty ordered list of [`SelRange`]s with one
//! primary range; all positions are UTF-16 code units, the same space the
//! change algebra uses. Selections are immutable values: every operation
//! returns a new selection.

use crate::change::{map_from, ChangeSet, MapWalk};
use crate::error::{Error, Result};
use crate::rope::Rope;

/// How a position moves when an edit lands exactly on it.
///
/// | Mode | at an insertion point | inside a deletion |
/// |------|-----------------------|-------------------|
/// | `Before` | stays before the insert | collapses to deletion start |
/// | `After` | moves after the insert | collapses to deletion start |
/// | `BeforeWord` | snaps to previous word start | previous word start |
/// | `AfterWord` | snaps to next word start | next word start |
/// | `BeforeSticky` | stays before the insert | keeps its relative offset |
/// | `AfterSticky` | moves after the insert | keeps its relative offset |
///
/// The sticky modes exist for exact-size replacements (delete `n`, insert
/// `n`), where a cursor in the middle should stay in the middle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before inserted text; collapse to a deletion's start.
    #[default]
    Before,
    /// Move after inserted text; collapse to a deletion's start.
    After,
    /// Snap to the previous word start.
    BeforeWord,
    /// Snap to the next word start.
    AfterWord,
    /// Keep the relative offset through exact-size replacements.
    BeforeSticky,
    /// Keep the relative offset through exact-size replacements.
    AfterSticky,
}

/// A single selection range: an anchor, a head (the moving end, where the
/// cursor is) and the association used when mapping through edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelRange {
    /// The fixed end of the selection.
    pub anchor: usize,
    /// The moving end of the selection; equal to `anchor` for a caret.
    pub head: usize,
    /// How this range's endpoints move through edits.
    pub assoc: Assoc,
}

impl SelRange {
    /// A range from `anchor` to `head` with the default association.
    pub fn new(anchor: usize, head: usize) -> Self {
        SelRange {
            anchor,
            head,
            assoc: Assoc::default(),
        }
    }

    /// A caret at `pos`.
    pub fn point(pos: usize) -> Self {
        SelRange::new(pos, pos)
    }

    /// Sets the association mode.
    pub fn with_assoc(mut self, assoc: Assoc) -> Self {
        self.assoc = assoc;
        self
    }

    /// The cursor position (the head).
    pub fn cursor(&self) -> usize {
        self.head
    }

    /// Returns `true` when anchor and head coincide.
    pub fn is_point(&self) -> bool {
        self.anchor == self.head
    }

    /// The smaller endpoint.
    pub fn min(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// The larger endpoint.
    pub fn max(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Width of the range in code units.
    pub fn len(&self) -> usize {
        self.max() - self.min()
    }

    /// Returns `true` for a caret (zero-width range).
    pub fn is_empty(&self) -> bool {
        self.is_point()
    }

    /// Returns `true` if `pos` lies within the range (inclusive ends).
    pub fn contains(&self, pos: usize) -> bool {
        self.min() <= pos && pos <= self.max()
    }

    /// Returns `true` if the ranges share any position.
    pub fn overlaps(&self, other: &SelRange) -> bool {
        self.min() < other.max() && other.min() < self.max()
            || self.min() == other.min()
    }

    /// The union of two ranges, oriented forward.
    pub fn merge(&self, other: &SelRange) -> SelRange {
        SelRange {
            anchor: self.min().min(other.min()),
            head: self.max().max(other.max()),
            assoc: self.assoc,
        }
    }

    /// The overlap of two ranges, if any.
    pub fn intersect(&self, other: &SelRange) -> Option<SelRange> {
        let min = self.min().max(other.min());
        let max = self.max().min(other.max());
        if min <= max {
            Some(SelRange {
                anchor: min,
                head: max,
                assoc: self.assoc,
            })
        } else {
            None
        }
    }

    /// Maps both endpoints through `change` using this range's association.
    /// `doc` is the post-change document for the word-snapping modes.
    pub fn map_through(&self, change: &ChangeSet, doc: Option<&Rope>) -> SelRange {
        SelRange {
            anchor: change.map_pos_in(doc, self.anchor, self.assoc),
            head: change.map_pos_in(doc, self.head, self.assoc),
            assoc: self.assoc,
        }
    }
}

/// A non-empty ordered set of ranges with one primary range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<SelRange>,
    primary_index: usize,
}

impl Selection {
    /// A selection holding a single range.
    pub fn single(range: SelRange) -> Self {
        Selection {
            ranges: vec![range],
            primary_index: 0,
        }
    }

    /// A selection with a caret at `pos`.
    pub fn point(pos: usize) -> Self {
        Selection::single(SelRange::point(pos))
    }

    /// Builds a selection from ranges; an empty input degenerates to a
    /// caret at 0, and an out-of-range primary index is clamped to 0.
    pub fn from_ranges(ranges: Vec<SelRange>, primary_index: usize) -> Self {
        if ranges.is_empty() {
            return Selection::point(0);
        }
        let primary_index = if primary_index < ranges.len() {
            primary_index
        } else {
            0
        };
        Selection {
            ranges,
            primary_index,
        }
    }

    /// The ranges, in order.
    pub fn ranges(&self) -> &[SelRange] {
        &self.ranges
    }

    /// Number of ranges; always at least 1.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Selections are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The primary range.
    pub fn primary(&self) -> SelRange {
        self.ranges[self.primary_index]
    }

    /// Index of the primary range.
    pub fn primary_index(&self) -> usize {
        self.primary_index
    }

    /// Returns a new selection with `range` appended.
    pub fn add_range(&self, range: SelRange) -> Selection {
        let mut ranges = self.ranges.clone();
        ranges.push(range);
        Selection {
            ranges,
            primary_index: self.primary_index,
        }
    }

    /// Returns a new selection with the primary moved to `index`.
    pub fn set_primary(&self, index: usize) -> Result<Selection> {
        if index >= self.ranges.len() {
            return Err(Error::OutOfBounds {
                op: "set_primary",
                position: index,
                min: 0,
                max: self.ranges.len(),
            });
        }
        Ok(Selection {
            ranges: self.ranges.clone(),
            primary_index: index,
        })
    }

    /// Sorts ranges by their lower bound and merges overlapping ones; the
    /// primary follows the range that absorbed the old primary's cursor.
    pub fn merge_overlapping(&self) -> Selection {
        let primary_cursor = self.primary().cursor();
        let mut sorted = self.ranges.clone();
        sorted.sort_by_key(|range| (range.min(), range.max()));

        let mut merged: Vec<SelRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.min() < last.max() || range.min() == last.min() => {
                    *last = last.merge(&range);
                }
                _ => merged.push(range),
            }
        }
        let primary_index = merged
            .iter()
            .position(|range| range.contains(primary_cursor))
            .unwrap_or_else(|| merged.len().saturating_sub(1));
        Selection {
            ranges: merged,
            primary_index,
        }
    }

    /// Pairwise intersection with another selection; `None` when nothing
    /// overlaps (a selection must stay non-empty).
    pub fn intersect(&self, other: &Selection) -> Option<Selection> {
        let mut out = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                if let Some(overlap) = a.intersect(b) {
                    out.push(overlap);
                }
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(Selection::from_ranges(out, 0).merge_overlapping())
        }
    }

    /// Maps every range through `change`, returning the new selection.
    /// `doc` is the post-change document for the word-snapping modes.
    pub fn map_through(&self, change: &ChangeSet, doc: Option<&Rope>) -> Selection {
        let ranges = self
            .ranges
            .iter()
            .map(|range| range.map_through(change, doc))
            .collect();
        Selection {
            ranges,
            primary_index: self.primary_index,
        }
    }
}

/// Maps batches of positions through one change.
///
/// When the queried positions are sorted (detected in O(k)) the mapper
/// streams the op list once, giving O(n + k); otherwise it falls back to
/// mapping each position independently in O(n · k).
pub struct PositionMapper<'a> {
    change: &'a ChangeSet,
    doc: Option<&'a Rope>,
}

impl<'a> PositionMapper<'a> {
    /// A mapper over `change` without word-boundary support.
    pub fn new(change: &'a ChangeSet) -> Self {
        PositionMapper { change, doc: None }
    }

    /// A mapper that can also resolve the word-snapping association modes
    /// against `doc` (the post-change document).
    pub fn with_doc(change: &'a ChangeSet, doc: &'a Rope) -> Self {
        PositionMapper {
            change,
            doc: Some(doc),
        }
    }

    /// Maps `positions` (position, association) pairs, preserving order.
    pub fn map(&self, positions: &[(usize, Assoc)]) -> Vec<usize> {
        let sorted = positions.windows(2).all(|pair| pair[0].0 <= pair[1].0);
        if sorted {
            self.map_sorted(positions)
        } else {
            positions
                .iter()
                .map(|&(pos, assoc)| self.change.map_pos_in(self.doc, pos, assoc))
                .collect()
        }
    }

    /// Single streaming walk: the shared cursor consumes ops that lie fully
    /// before each query, and the per-query resolution only inspects the
    /// handful of ops at the query point.
    fn map_sorted(&self, positions: &[(usize, Assoc)]) -> Vec<usize> {
        let mut walk = MapWalk::default();
        let mut out = Vec::with_capacity(positions.len());
        for &(pos, assoc) in positions {
            walk.advance_to(self.change, pos);
            out.push(map_from(walk, self.change, self.doc, pos, assoc));
        }
        out
    }
}
