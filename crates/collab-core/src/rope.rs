//! Persistent rope over UTF-8 text.
//!
//! The rope is an immutable binary tree: leaves hold short UTF-8 strings,
//! branches cache summaries (chars, bytes, UTF-16 code units, line breaks)
//! of their left subtree so every positional descent is O(log N). All
//! structural operations — [`Rope::insert`], [`Rope::delete`],
//! [`Rope::split`], [`Rope::concat`] — return a new rope and share
//! untouched subtrees with the original via `Arc`. Cloning is O(1).
//!
//! Balance is maintained with AVL-style joins on every structural edit;
//! [`Rope::balance`] rebuilds an optimally balanced tree from the same
//! leaves and [`Rope::optimize`] additionally coalesces small adjacent
//! leaves.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Target byte size for leaves produced by builders and [`Rope::optimize`].
pub(crate) const MAX_LEAF_BYTES: usize = 1024;

/// Hard cap on tree height checked by [`Rope::validate`].
const MAX_HEIGHT: usize = 96;

/// Policy for whether a trailing `'\n'` opens an additional empty line.
///
/// The policy is fixed when a rope is constructed and carried through every
/// derived rope; it never varies per call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinePolicy {
    /// A final `'\n'` terminates the last line: `"a\nb\n"` has 2 lines.
    #[default]
    FinalNewlineTerminatesLastLine,
    /// A final `'\n'` starts a new (empty) line: `"a\nb\n"` has 3 lines.
    TrailingNewlineStartsNewLine,
}

/// Cached metrics for a subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    /// Unicode scalar values.
    pub chars: usize,
    /// UTF-8 bytes.
    pub bytes: usize,
    /// UTF-16 code units.
    pub utf16: usize,
    /// `'\n'` count.
    pub breaks: usize,
    /// Leaves in the subtree.
    pub leaves: usize,
}

impl Summary {
    pub(crate) fn of(text: &str) -> Self {
        let mut summary = Summary {
            bytes: text.len(),
            leaves: 1,
            ..Summary::default()
        };
        for ch in text.chars() {
            summary.chars += 1;
            summary.utf16 += ch.len_utf16();
            if ch == '\n' {
                summary.breaks += 1;
            }
        }
        summary
    }

    pub(crate) fn add(self, other: Summary) -> Summary {
        Summary {
            chars: self.chars + other.chars,
            bytes: self.bytes + other.bytes,
            utf16: self.utf16 + other.utf16,
            breaks: self.breaks + other.breaks,
            leaves: self.leaves + other.leaves,
        }
    }
}

/// Tree node. Leaves are never empty; empty ropes have no root at all.
#[derive(Debug)]
pub(crate) enum Node {
    Leaf {
        text: Arc<str>,
        summary: Summary,
    },
    Branch {
        left: Arc<Node>,
        right: Arc<Node>,
        /// Summary of the left subtree, used for positional descent.
        left_summary: Summary,
        /// Summary of the whole subtree.
        summary: Summary,
        height: usize,
    },
}

impl Node {
    fn leaf(text: &str) -> Arc<Node> {
        debug_assert!(!text.is_empty());
        Arc::new(Node::Leaf {
            summary: Summary::of(text),
            text: Arc::from(text),
        })
    }

    fn branch(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
        let left_summary = left.summary();
        let height = left.height().max(right.height()) + 1;
        Arc::new(Node::Branch {
            summary: left_summary.add(right.summary()),
            left_summary,
            height,
            left,
            right,
        })
    }

    pub(crate) fn summary(&self) -> Summary {
        match self {
            Node::Leaf { summary, .. } => *summary,
            Node::Branch { summary, .. } => *summary,
        }
    }

    fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Branch { height, .. } => *height,
        }
    }
}

/// Joins two subtrees, keeping the result height-balanced.
fn join(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
    let hl = left.height();
    let hr = right.height();
    if hl.abs_diff(hr) <= 1 {
        return Node::branch(left, right);
    }
    if hl > hr {
        match &*left {
            Node::Branch {
                left: a, right: b, ..
            } => {
                let new_right = join(b.clone(), right);
                rebalance(a.clone(), new_right)
            }
            // A leaf has height 1, so it can never be 2 taller than `right`.
            Node::Leaf { .. } => Node::branch(left, right),
        }
    } else {
        match &*right {
            Node::Branch {
                left: a, right: b, ..
            } => {
                let new_left = join(left, a.clone());
                rebalance(new_left, b.clone())
            }
            Node::Leaf { .. } => Node::branch(left, right),
        }
    }
}

/// Builds a branch over `left` and `right`, rotating once if their heights
/// differ by more than one. The join recursion only ever produces a gap of
/// at most two here, so a single (or double) rotation restores the bound.
fn rebalance(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
    let hl = left.height();
    let hr = right.height();
    if hr > hl + 1 {
        if let Node::Branch {
            left: rl, right: rr, ..
        } = &*right
        {
            if rl.height() > rr.height() {
                if let Node::Branch {
                    left: rll,
                    right: rlr,
                    ..
                } = &**rl
                {
                    return Node::branch(
                        Node::branch(left, rll.clone()),
                        Node::branch(rlr.clone(), rr.clone()),
                    );
                }
            }
            return Node::branch(Node::branch(left, rl.clone()), rr.clone());
        }
    } else if hl > hr + 1 {
        if let Node::Branch {
            left: ll, right: lr, ..
        } = &*left
        {
            if lr.height() > ll.height() {
                if let Node::Branch {
                    left: lrl,
                    right: lrr,
                    ..
                } = &**lr
                {
                    return Node::branch(
                        Node::branch(ll.clone(), lrl.clone()),
                        Node::branch(lrr.clone(), right),
                    );
                }
            }
            return Node::branch(ll.clone(), Node::branch(lr.clone(), right));
        }
    }
    Node::branch(left, right)
}

fn join_opt(left: Option<Arc<Node>>, right: Option<Arc<Node>>) -> Option<Arc<Node>> {
    match (left, right) {
        (None, node) | (node, None) => node,
        (Some(left), Some(right)) => Some(join(left, right)),
    }
}

/// Splits `node` at `pos` (in chars), sharing every untouched subtree.
fn split_node(node: &Arc<Node>, pos: usize) -> (Option<Arc<Node>>, Option<Arc<Node>>) {
    match &**node {
        Node::Leaf { text, summary } => {
            if pos == 0 {
                (None, Some(node.clone()))
            } else if pos >= summary.chars {
                (Some(node.clone()), None)
            } else {
                let byte = byte_of_char(text, pos);
                (Some(Node::leaf(&text[..byte])), Some(Node::leaf(&text[byte..])))
            }
        }
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos < left_summary.chars {
                let (a, b) = split_node(left, pos);
                (a, join_opt(b, Some(right.clone())))
            } else if pos == left_summary.chars {
                (Some(left.clone()), Some(right.clone()))
            } else {
                let (a, b) = split_node(right, pos - left_summary.chars);
                (join_opt(Some(left.clone()), a), b)
            }
        }
    }
}

/// Byte offset of the `pos`-th char in `text`. `pos` must be in range.
pub(crate) fn byte_of_char(text: &str, pos: usize) -> usize {
    text.char_indices()
        .nth(pos)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

fn collect_leaves(node: &Arc<Node>, out: &mut Vec<Arc<Node>>) {
    match &**node {
        Node::Leaf { .. } => out.push(node.clone()),
        Node::Branch { left, right, .. } => {
            collect_leaves(left, out);
            collect_leaves(right, out);
        }
    }
}

/// Bottom-up pairwise rebuild; produces a tree of minimal height over the
/// given leaves.
fn build_from_leaves(mut level: Vec<Arc<Node>>) -> Option<Arc<Node>> {
    if level.is_empty() {
        return None;
    }
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        let mut nodes = level.into_iter();
        while let Some(left) = nodes.next() {
            match nodes.next() {
                Some(right) => next.push(Node::branch(left, right)),
                None => next.push(left),
            }
        }
        level = next;
    }
    level.pop()
}

/// Segments `text` into leaves of at most [`MAX_LEAF_BYTES`], split at char
/// boundaries, and returns a balanced subtree over them.
fn leaves_from_text(text: &str) -> Option<Arc<Node>> {
    if text.is_empty() {
        return None;
    }
    if text.len() <= MAX_LEAF_BYTES {
        return Some(Node::leaf(text));
    }
    let mut leaves = Vec::with_capacity(text.len() / MAX_LEAF_BYTES + 1);
    let mut rest = text;
    while !rest.is_empty() {
        if rest.len() <= MAX_LEAF_BYTES {
            leaves.push(Node::leaf(rest));
            break;
        }
        let mut cut = MAX_LEAF_BYTES;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        leaves.push(Node::leaf(&rest[..cut]));
        rest = &rest[cut..];
    }
    build_from_leaves(leaves)
}

/// Structural metrics of a rope, as reported by [`Rope::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Unicode scalar values.
    pub chars: usize,
    /// UTF-8 bytes.
    pub bytes: usize,
    /// UTF-16 code units.
    pub utf16: usize,
    /// `'\n'` count.
    pub line_breaks: usize,
    /// Number of leaves.
    pub leaves: usize,
    /// Tree height (a leaf-only rope has depth 1, an empty rope 0).
    pub depth: usize,
}

/// An immutable, persistent rope over UTF-8 text.
///
/// Structural operations return new ropes; untouched subtrees are shared,
/// so old revisions stay cheap to keep around. Equality ([`PartialEq`]) and
/// [`Rope::hash64`] depend only on content, never on how the text is
/// partitioned into leaves.
#[derive(Clone)]
pub struct Rope {
    root: Option<Arc<Node>>,
    policy: LinePolicy,
}

impl Rope {
    /// Creates an empty rope with the default [`LinePolicy`].
    pub fn new() -> Self {
        Rope {
            root: None,
            policy: LinePolicy::default(),
        }
    }

    /// Creates a rope from `text` with the default [`LinePolicy`].
    pub fn from_text(text: &str) -> Self {
        Rope {
            root: leaves_from_text(text),
            policy: LinePolicy::default(),
        }
    }

    /// Creates a rope from `text` with an explicit trailing-newline policy.
    pub fn with_policy(text: &str, policy: LinePolicy) -> Self {
        Rope {
            root: leaves_from_text(text),
            policy,
        }
    }

    fn from_root(&self, root: Option<Arc<Node>>) -> Rope {
        Rope {
            root,
            policy: self.policy,
        }
    }

    pub(crate) fn root(&self) -> Option<&Arc<Node>> {
        self.root.as_ref()
    }

    pub(crate) fn summary(&self) -> Summary {
        self.root.as_ref().map(|n| n.summary()).unwrap_or_default()
    }

    /// The trailing-newline policy this rope was constructed with.
    pub fn line_policy(&self) -> LinePolicy {
        self.policy
    }

    /// Length in Unicode scalar values. O(1).
    pub fn len_chars(&self) -> usize {
        self.summary().chars
    }

    /// Length in UTF-8 bytes. O(1).
    pub fn len_bytes(&self) -> usize {
        self.summary().bytes
    }

    /// Length in UTF-16 code units. O(1).
    pub fn len_utf16(&self) -> usize {
        self.summary().utf16
    }

    /// Returns `true` if the rope holds no text.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of lines under this rope's [`LinePolicy`]. O(log N).
    ///
    /// An empty rope has 0 lines.
    pub fn line_count(&self) -> usize {
        let summary = self.summary();
        if summary.chars == 0 {
            return 0;
        }
        match self.policy {
            LinePolicy::FinalNewlineTerminatesLastLine => {
                if self.last_char() == Some('\n') {
                    summary.breaks
                } else {
                    summary.breaks + 1
                }
            }
            LinePolicy::TrailingNewlineStartsNewLine => summary.breaks + 1,
        }
    }

    /// The last scalar value, or `None` for an empty rope. O(log N).
    pub fn last_char(&self) -> Option<char> {
        let mut node = self.root.as_deref()?;
        loop {
            match node {
                Node::Leaf { text, .. } => return text.chars().last(),
                Node::Branch { right, .. } => node = right,
            }
        }
    }

    /// The scalar value at char position `pos`. O(log N).
    pub fn char_at(&self, pos: usize) -> Result<char> {
        let len = self.len_chars();
        if pos >= len {
            return Err(Error::OutOfBounds {
                op: "char_at",
                position: pos,
                min: 0,
                max: len,
            });
        }
        let mut node = match self.root.as_deref() {
            Some(node) => node,
            None => unreachable!("non-empty rope has a root"),
        };
        let mut pos = pos;
        loop {
            match node {
                Node::Leaf { text, .. } => {
                    return text.chars().nth(pos).ok_or(Error::StructuralInvariant {
                        description: "leaf shorter than its summary".to_string(),
                    });
                }
                Node::Branch {
                    left,
                    right,
                    left_summary,
                    ..
                } => {
                    if pos < left_summary.chars {
                        node = left;
                    } else {
                        pos -= left_summary.chars;
                        node = right;
                    }
                }
            }
        }
    }

    /// The byte at byte position `pos`. O(log N).
    pub fn byte_at(&self, pos: usize) -> Result<u8> {
        let len = self.len_bytes();
        if pos >= len {
            return Err(Error::OutOfBounds {
                op: "byte_at",
                position: pos,
                min: 0,
                max: len,
            });
        }
        let mut node = match self.root.as_deref() {
            Some(node) => node,
            None => unreachable!("non-empty rope has a root"),
        };
        let mut pos = pos;
        loop {
            match node {
                Node::Leaf { text, .. } => {
                    return text.as_bytes().get(pos).copied().ok_or(Error::StructuralInvariant {
                        description: "leaf shorter than its summary".to_string(),
                    });
                }
                Node::Branch {
                    left,
                    right,
                    left_summary,
                    ..
                } => {
                    if pos < left_summary.bytes {
                        node = left;
                    } else {
                        pos -= left_summary.bytes;
                        node = right;
                    }
                }
            }
        }
    }

    fn check_range(&self, op: &'static str, start: usize, end: usize) -> Result<()> {
        let len = self.len_chars();
        if start > end || end > len {
            return Err(Error::InvalidRange {
                op,
                start,
                end,
                valid_max: len,
            });
        }
        Ok(())
    }

    /// The text of `[start, end)` (char positions) as an owned `String`.
    pub fn slice(&self, start: usize, end: usize) -> Result<String> {
        self.check_range("slice", start, end)?;
        let mut out = String::new();
        if let Some(root) = &self.root {
            slice_into(root, start, end, &mut out);
        }
        Ok(out)
    }

    /// A structural sub-rope over `[start, end)` (char positions), sharing
    /// leaves with `self` wherever the cut lines up with leaf boundaries.
    pub fn slice_rope(&self, start: usize, end: usize) -> Result<Rope> {
        self.check_range("slice_rope", start, end)?;
        let root = match &self.root {
            None => None,
            Some(root) => {
                let (_, rest) = split_node(root, start);
                match rest {
                    None => None,
                    Some(rest) => split_node(&rest, end - start).0,
                }
            }
        };
        Ok(self.from_root(root))
    }

    /// Inserts `text` at char position `pos`, returning a new rope.
    pub fn insert(&self, pos: usize, text: &str) -> Result<Rope> {
        let len = self.len_chars();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "insert",
                position: pos,
                min: 0,
                max: len,
            });
        }
        if text.is_empty() {
            return Ok(self.clone());
        }
        let middle = leaves_from_text(text);
        let root = match &self.root {
            None => middle,
            Some(root) => {
                let (left, right) = split_node(root, pos);
                join_opt(join_opt(left, middle), right)
            }
        };
        Ok(self.from_root(root))
    }

    /// Removes the scalars in `[start, end)`, returning a new rope.
    pub fn delete(&self, start: usize, end: usize) -> Result<Rope> {
        self.check_range("delete", start, end)?;
        if start == end {
            return Ok(self.clone());
        }
        let root = match &self.root {
            None => None,
            Some(root) => {
                let (left, rest) = split_node(root, start);
                let right = rest.and_then(|rest| split_node(&rest, end - start).1);
                join_opt(left, right)
            }
        };
        Ok(self.from_root(root))
    }

    /// Replaces `[start, end)` with `text` as a single structural operation.
    pub fn replace(&self, start: usize, end: usize, text: &str) -> Result<Rope> {
        self.check_range("replace", start, end)?;
        let middle = leaves_from_text(text);
        let root = match &self.root {
            None => middle,
            Some(root) => {
                let (left, rest) = split_node(root, start);
                let right = rest.and_then(|rest| split_node(&rest, end - start).1);
                join_opt(join_opt(left, middle), right)
            }
        };
        Ok(self.from_root(root))
    }

    /// Splits the rope at char position `pos` into `(left, right)`.
    pub fn split(&self, pos: usize) -> Result<(Rope, Rope)> {
        let len = self.len_chars();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "split",
                position: pos,
                min: 0,
                max: len,
            });
        }
        let (left, right) = match &self.root {
            None => (None, None),
            Some(root) => split_node(root, pos),
        };
        Ok((self.from_root(left), self.from_root(right)))
    }

    /// Concatenates `other` after `self` without copying any leaf.
    ///
    /// The result keeps `self`'s [`LinePolicy`].
    pub fn concat(&self, other: &Rope) -> Rope {
        self.from_root(join_opt(self.root.clone(), other.root.clone()))
    }

    /// Appends `text` at the end.
    pub fn append(&self, text: &str) -> Rope {
        self.from_root(join_opt(self.root.clone(), leaves_from_text(text)))
    }

    /// Prepends `text` at the beginning.
    pub fn prepend(&self, text: &str) -> Rope {
        self.from_root(join_opt(leaves_from_text(text), self.root.clone()))
    }

    /// Materializes the full content as a `String`.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len_bytes());
        self.for_each_chunk(|chunk| out.push_str(chunk));
        out
    }

    /// Materializes the full content as bytes.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len_bytes());
        self.for_each_chunk(|chunk| out.extend_from_slice(chunk.as_bytes()));
        out
    }

    /// Calls `f` with every leaf's text, in order.
    pub(crate) fn for_each_chunk<F: FnMut(&str)>(&self, mut f: F) {
        fn walk<F: FnMut(&str)>(node: &Node, f: &mut F) {
            match node {
                Node::Leaf { text, .. } => f(text),
                Node::Branch { left, right, .. } => {
                    walk(left, f);
                    walk(right, f);
                }
            }
        }
        if let Some(root) = &self.root {
            walk(root, &mut f);
        }
    }

    /// Content equality, independent of leaf partitioning.
    pub fn content_eq(&self, other: &Rope) -> bool {
        let a = self.summary();
        let b = other.summary();
        if a.bytes != b.bytes || a.chars != b.chars {
            return false;
        }
        let mut left = LeafWalker::new(self.root.as_deref());
        let mut right = LeafWalker::new(other.root.as_deref());
        let (mut la, mut lb) = (left.next_leaf().unwrap_or(""), right.next_leaf().unwrap_or(""));
        loop {
            if la.is_empty() {
                match left.next_leaf() {
                    Some(next) => la = next,
                    None => return lb.is_empty() && right.next_leaf().is_none(),
                }
                continue;
            }
            if lb.is_empty() {
                match right.next_leaf() {
                    Some(next) => lb = next,
                    None => return false,
                }
                continue;
            }
            let step = la.len().min(lb.len());
            if la.as_bytes()[..step] != lb.as_bytes()[..step] {
                return false;
            }
            la = &la[step..];
            lb = &lb[step..];
        }
    }

    /// 64-bit content hash, invariant under leaf partitioning.
    ///
    /// The leaf stream is fed through a streaming digest in order, so two
    /// ropes with equal text always hash equal regardless of chunking.
    pub fn hash64(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        self.for_each_chunk(|chunk| {
            hasher.update(chunk.as_bytes());
        });
        let digest = hasher.finalize();
        let mut out = [0u8; 8];
        out.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(out)
    }

    /// 32-bit content hash, used by savepoint dedup.
    pub fn hash32(&self) -> u32 {
        let mut hasher = blake3::Hasher::new();
        self.for_each_chunk(|chunk| {
            hasher.update(chunk.as_bytes());
        });
        let digest = hasher.finalize();
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest.as_bytes()[..4]);
        u32::from_le_bytes(out)
    }

    /// Returns `true` if both ropes hash equal (and therefore, outside of
    /// digest collisions, hold the same text).
    pub fn hash_eq(&self, other: &Rope) -> bool {
        self.hash64() == other.hash64()
    }

    /// Tree height; 0 for an empty rope.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(|n| n.height()).unwrap_or(0)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.summary().leaves
    }

    /// Structural metrics.
    pub fn stats(&self) -> TreeStats {
        let summary = self.summary();
        TreeStats {
            chars: summary.chars,
            bytes: summary.bytes,
            utf16: summary.utf16,
            line_breaks: summary.breaks,
            leaves: summary.leaves,
            depth: self.depth(),
        }
    }

    /// Returns `true` if the tree height is within the balance bound for
    /// its leaf count.
    pub fn is_balanced(&self) -> bool {
        match &self.root {
            None => true,
            Some(root) => root.height() <= height_cap(root.summary().leaves),
        }
    }

    /// Rebuilds an optimally balanced tree from the same leaves.
    pub fn balance(&self) -> Rope {
        let root = match &self.root {
            None => None,
            Some(root) => {
                let mut leaves = Vec::with_capacity(root.summary().leaves);
                collect_leaves(root, &mut leaves);
                build_from_leaves(leaves)
            }
        };
        self.from_root(root)
    }

    /// Rebuilds the tree, coalescing adjacent leaves up to the target leaf
    /// size. Unlike [`Rope::balance`] this copies small leaves.
    pub fn optimize(&self) -> Rope {
        let root = match &self.root {
            None => None,
            Some(root) => {
                let mut leaves = Vec::with_capacity(root.summary().leaves);
                collect_leaves(root, &mut leaves);
                let mut merged: Vec<Arc<Node>> = Vec::with_capacity(leaves.len());
                let mut pending = String::new();
                for leaf in leaves {
                    let text = match &*leaf {
                        Node::Leaf { text, .. } => text.clone(),
                        Node::Branch { .. } => continue,
                    };
                    if pending.is_empty() && text.len() >= MAX_LEAF_BYTES {
                        merged.push(leaf);
                        continue;
                    }
                    if pending.len() + text.len() > MAX_LEAF_BYTES && !pending.is_empty() {
                        merged.push(Node::leaf(&pending));
                        pending.clear();
                    }
                    pending.push_str(&text);
                    if pending.len() >= MAX_LEAF_BYTES {
                        merged.push(Node::leaf(&pending));
                        pending.clear();
                    }
                }
                if !pending.is_empty() {
                    merged.push(Node::leaf(&pending));
                }
                build_from_leaves(merged)
            }
        };
        self.from_root(root)
    }

    /// Checks the structural invariants of the tree, returning the first
    /// violation found: empty leaves, stale summaries, wrong cached heights
    /// or a height beyond the hard cap.
    pub fn validate(&self) -> Result<()> {
        fn check(node: &Node) -> Result<Summary> {
            match node {
                Node::Leaf { text, summary } => {
                    if text.is_empty() {
                        return Err(Error::StructuralInvariant {
                            description: "empty leaf".to_string(),
                        });
                    }
                    let actual = Summary::of(text);
                    if actual != *summary {
                        return Err(Error::StructuralInvariant {
                            description: format!(
                                "leaf summary mismatch: cached {:?}, actual {:?}",
                                summary, actual
                            ),
                        });
                    }
                    Ok(actual)
                }
                Node::Branch {
                    left,
                    right,
                    left_summary,
                    summary,
                    height,
                } => {
                    let actual_left = check(left)?;
                    let actual_right = check(right)?;
                    if actual_left != *left_summary {
                        return Err(Error::StructuralInvariant {
                            description: "branch left summary mismatch".to_string(),
                        });
                    }
                    let total = actual_left.add(actual_right);
                    if total != *summary {
                        return Err(Error::StructuralInvariant {
                            description: "branch summary mismatch".to_string(),
                        });
                    }
                    let actual_height = left.height().max(right.height()) + 1;
                    if actual_height != *height {
                        return Err(Error::StructuralInvariant {
                            description: "branch height mismatch".to_string(),
                        });
                    }
                    if *height > MAX_HEIGHT {
                        return Err(Error::StructuralInvariant {
                            description: format!("depth cap exceeded: {} > {}", height, MAX_HEIGHT),
                        });
                    }
                    Ok(total)
                }
            }
        }
        match &self.root {
            None => Ok(()),
            Some(root) => check(root).map(|_| ()),
        }
    }
}

/// Balance bound: about twice the height of a perfectly balanced tree.
fn height_cap(leaves: usize) -> usize {
    let log2 = usize::BITS - leaves.max(1).leading_zeros();
    2 * log2 as usize + 2
}

fn slice_into(node: &Node, start: usize, end: usize, out: &mut String) {
    if start >= end {
        return;
    }
    match node {
        Node::Leaf { text, summary } => {
            if start == 0 && end >= summary.chars {
                out.push_str(text);
            } else {
                let from = byte_of_char(text, start);
                let to = byte_of_char(text, end.min(summary.chars));
                out.push_str(&text[from..to]);
            }
        }
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            let mid = left_summary.chars;
            if start < mid {
                slice_into(left, start, end.min(mid), out);
            }
            if end > mid {
                slice_into(right, start.saturating_sub(mid), end - mid, out);
            }
        }
    }
}

/// In-order cursor over the leaves of a tree.
pub(crate) struct LeafWalker<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> LeafWalker<'a> {
    pub(crate) fn new(root: Option<&'a Node>) -> Self {
        let mut walker = LeafWalker { stack: Vec::new() };
        if let Some(root) = root {
            walker.descend(root);
        }
        walker
    }

    fn descend(&mut self, mut node: &'a Node) {
        loop {
            match node {
                Node::Leaf { .. } => {
                    self.stack.push(node);
                    return;
                }
                Node::Branch { left, right, .. } => {
                    self.stack.push(right);
                    node = left;
                }
            }
        }
    }

    pub(crate) fn next_leaf(&mut self) -> Option<&'a str> {
        let node = self.stack.pop()?;
        match node {
            Node::Leaf { text, .. } => Some(text),
            Node::Branch { .. } => {
                self.descend(node);
                match self.stack.pop() {
                    Some(Node::Leaf { text, .. }) => Some(text),
                    _ => None,
                }
            }
        }
    }
}

// ========== Character-level conveniences ==========

impl Rope {
    /// Inserts a single scalar value at `pos`.
    pub fn insert_char(&self, pos: usize, ch: char) -> Result<Rope> {
        let mut buf = [0u8; 4];
        self.insert(pos, ch.encode_utf8(&mut buf))
    }

    /// Removes the scalar at `pos`.
    pub fn delete_char(&self, pos: usize) -> Result<Rope> {
        let len = self.len_chars();
        if pos >= len {
            return Err(Error::OutOfBounds {
                op: "delete_char",
                position: pos,
                min: 0,
                max: len,
            });
        }
        self.delete(pos, pos + 1)
    }

    /// Replaces the scalar at `pos` with `ch`.
    pub fn replace_char(&self, pos: usize, ch: char) -> Result<Rope> {
        let len = self.len_chars();
        if pos >= len {
            return Err(Error::OutOfBounds {
                op: "replace_char",
                position: pos,
                min: 0,
                max: len,
            });
        }
        let mut buf = [0u8; 4];
        self.replace(pos, pos + 1, ch.encode_utf8(&mut buf))
    }

    /// Returns `true` if the rope contains `ch`.
    pub fn contains_char(&self, ch: char) -> bool {
        self.index_of_char(ch).is_some()
    }

    /// Char position of the first occurrence of `ch`.
    pub fn index_of_char(&self, ch: char) -> Option<usize> {
        let mut pos = 0;
        let mut found = None;
        self.for_each_chunk(|chunk| {
            if found.is_none() {
                if let Some(local) = chunk.chars().position(|c| c == ch) {
                    found = Some(pos + local);
                }
                pos += chunk.chars().count();
            }
        });
        found
    }

    /// Number of occurrences of `ch`.
    pub fn count_char(&self, ch: char) -> usize {
        let mut count = 0;
        self.for_each_chunk(|chunk| count += chunk.chars().filter(|&c| c == ch).count());
        count
    }

    /// Maps every scalar through `f` into a new rope.
    pub fn map_chars<F: FnMut(char) -> char>(&self, mut f: F) -> Rope {
        let mut builder = RopeBuilder::with_policy(self.policy);
        self.for_each_chunk(|chunk| {
            for ch in chunk.chars() {
                builder.push_char(f(ch));
            }
        });
        builder.build()
    }

    /// Keeps only the scalars for which `f` returns `true`.
    pub fn filter_chars<F: FnMut(char) -> bool>(&self, mut f: F) -> Rope {
        let mut builder = RopeBuilder::with_policy(self.policy);
        self.for_each_chunk(|chunk| {
            for ch in chunk.chars() {
                if f(ch) {
                    builder.push_char(ch);
                }
            }
        });
        builder.build()
    }

    /// Reverses the scalar order.
    pub fn reverse_chars(&self) -> Rope {
        let mut chars: Vec<char> = Vec::with_capacity(self.len_chars());
        self.for_each_chunk(|chunk| chars.extend(chunk.chars()));
        let mut builder = RopeBuilder::with_policy(self.policy);
        for ch in chars.into_iter().rev() {
            builder.push_char(ch);
        }
        builder.build()
    }

    /// Drops leading scalars matching `f`.
    pub fn trim_start_matches<F: FnMut(char) -> bool>(&self, mut f: F) -> Rope {
        let mut start = 0;
        let mut done = false;
        self.for_each_chunk(|chunk| {
            if done {
                return;
            }
            for ch in chunk.chars() {
                if f(ch) {
                    start += 1;
                } else {
                    done = true;
                    return;
                }
            }
        });
        match self.slice_rope(start, self.len_chars()) {
            Ok(rope) => rope,
            Err(_) => self.clone(),
        }
    }

    /// Drops trailing scalars matching `f`.
    pub fn trim_end_matches<F: FnMut(char) -> bool>(&self, mut f: F) -> Rope {
        let mut chars: Vec<char> = Vec::with_capacity(self.len_chars());
        self.for_each_chunk(|chunk| chars.extend(chunk.chars()));
        let mut end = chars.len();
        while end > 0 && f(chars[end - 1]) {
            end -= 1;
        }
        match self.slice_rope(0, end) {
            Ok(rope) => rope,
            Err(_) => self.clone(),
        }
    }

    /// Drops leading and trailing whitespace.
    pub fn trim_whitespace(&self) -> Rope {
        self.trim_start_matches(char::is_whitespace)
            .trim_end_matches(char::is_whitespace)
    }
}

impl Default for Rope {
    fn default() -> Self {
        Rope::new()
    }
}

impl From<&str> for Rope {
    fn from(text: &str) -> Self {
        Rope::from_text(text)
    }
}

impl From<String> for Rope {
    fn from(text: String) -> Self {
        Rope::from_text(&text)
    }
}

impl std::fmt::Display for Rope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut err = Ok(());
        self.for_each_chunk(|chunk| {
            if err.is_ok() {
                err = f.write_str(chunk);
            }
        });
        err
    }
}

impl std::fmt::Debug for Rope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rope({:?})", self.text())
    }
}

/// Content equality; the line policy does not participate.
impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Rope {}

/// Incrementally builds a rope from text fragments.
///
/// Fragments are buffered and flushed into leaves near the target leaf
/// size, so the finished rope is balanced and compact regardless of how
/// the input was sliced.
pub struct RopeBuilder {
    leaves: Vec<Arc<Node>>,
    pending: String,
    policy: LinePolicy,
}

impl RopeBuilder {
    /// Creates a builder producing a rope with the default [`LinePolicy`].
    pub fn new() -> Self {
        Self::with_policy(LinePolicy::default())
    }

    /// Creates a builder producing a rope with the given policy.
    pub fn with_policy(policy: LinePolicy) -> Self {
        RopeBuilder {
            leaves: Vec::new(),
            pending: String::new(),
            policy,
        }
    }

    /// Appends a text fragment.
    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
        self.flush_full();
    }

    /// Appends a single scalar value.
    pub fn push_char(&mut self, ch: char) {
        self.pending.push(ch);
        self.flush_full();
    }

    fn flush_full(&mut self) {
        while self.pending.len() >= MAX_LEAF_BYTES {
            let mut cut = MAX_LEAF_BYTES;
            while !self.pending.is_char_boundary(cut) {
                cut -= 1;
            }
            self.leaves.push(Node::leaf(&self.pending[..cut]));
            self.pending.drain(..cut);
        }
    }

    /// Finishes the rope.
    pub fn build(mut self) -> Rope {
        if !self.pending.is_empty() {
            self.leaves.push(Node::leaf(&self.pending));
        }
        Rope {
            root: build_from_leaves(self.leaves),
            policy: self.policy,
        }
    }
}

impl Default for RopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rope() {
        let rope = Rope::new();
        assert!(rope.is_empty());
        assert_eq!(rope.len_chars(), 0);
        assert_eq!(rope.len_bytes(), 0);
        assert_eq!(rope.len_utf16(), 0);
        assert_eq!(rope.line_count(), 0);
        assert_eq!(rope.text(), "");
    }

    #[test]
    fn test_from_text_lengths() {
        let rope = Rope::from_text("Hello 世界 🌍");
        assert_eq!(rope.len_chars(), 10);
        assert_eq!(rope.len_bytes(), "Hello 世界 🌍".len());
        // BMP scalars count 1, the emoji counts 2.
        assert_eq!(rope.len_utf16(), 11);
    }

    #[test]
    fn test_char_at_and_byte_at() {
        let rope = Rope::from_text("héllo");
        assert_eq!(rope.char_at(0).unwrap(), 'h');
        assert_eq!(rope.char_at(1).unwrap(), 'é');
        assert_eq!(rope.char_at(4).unwrap(), 'o');
        assert!(rope.char_at(5).is_err());
        assert_eq!(rope.byte_at(0).unwrap(), b'h');
        assert!(rope.byte_at(100).is_err());
    }

    #[test]
    fn test_insert_delete_replace() {
        let rope = Rope::from_text("Hello World");
        let rope2 = rope.insert(5, ",").unwrap();
        assert_eq!(rope2.text(), "Hello, World");
        // Original untouched.
        assert_eq!(rope.text(), "Hello World");

        let rope3 = rope2.delete(5, 6).unwrap();
        assert_eq!(rope3.text(), "Hello World");

        let rope4 = rope.replace(6, 11, "Rust").unwrap();
        assert_eq!(rope4.text(), "Hello Rust");
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let rope = Rope::from_text("abc");
        assert!(matches!(
            rope.insert(4, "x"),
            Err(Error::OutOfBounds { op: "insert", .. })
        ));
    }

    #[test]
    fn test_delete_reversed_range() {
        let rope = Rope::from_text("abc");
        assert!(matches!(
            rope.delete(2, 1),
            Err(Error::InvalidRange { op: "delete", .. })
        ));
    }

    #[test]
    fn test_split_and_concat() {
        let rope = Rope::from_text("Hello World");
        let (left, right) = rope.split(5).unwrap();
        assert_eq!(left.text(), "Hello");
        assert_eq!(right.text(), " World");
        let merged = left.concat(&right);
        assert_eq!(merged.text(), "Hello World");
        assert_eq!(merged.hash64(), rope.hash64());
    }

    #[test]
    fn test_slice() {
        let rope = Rope::from_text("Hello World");
        assert_eq!(rope.slice(0, 5).unwrap(), "Hello");
        assert_eq!(rope.slice(6, 11).unwrap(), "World");
        assert_eq!(rope.slice(3, 3).unwrap(), "");
        assert!(rope.slice(6, 12).is_err());
        assert!(rope.slice(7, 6).is_err());
    }

    #[test]
    fn test_slice_unicode() {
        let rope = Rope::from_text("a日b本c");
        assert_eq!(rope.slice(1, 4).unwrap(), "日b本");
    }

    #[test]
    fn test_structural_sharing_on_insert() {
        let text = "x".repeat(4 * MAX_LEAF_BYTES);
        let rope = Rope::from_text(&text);
        let edited = rope.insert(0, "y").unwrap();
        assert_eq!(edited.len_chars(), rope.len_chars() + 1);
        // A prefix edit must not have copied the whole tree.
        assert!(edited.leaf_count() <= rope.leaf_count() + 2);
    }

    #[test]
    fn test_builder_chunk_invariant_hash() {
        let mut b1 = RopeBuilder::new();
        b1.push("Hello w");
        b1.push("orld");
        let r1 = b1.build();

        let mut b2 = RopeBuilder::new();
        b2.push("Hell");
        b2.push("o world");
        let r2 = b2.build();

        assert_eq!(r1.hash64(), r2.hash64());
        assert_eq!(r1.hash32(), r2.hash32());
        assert!(r1.content_eq(&r2));
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_hash_differs_on_content_change() {
        let rope = Rope::from_text("Hello World");
        let edited = rope.insert(5, "XXX").unwrap();
        assert_ne!(rope.hash64(), edited.hash64());
    }

    #[test]
    fn test_empty_hash_consistent() {
        assert_eq!(Rope::new().hash64(), Rope::from_text("").hash64());
    }

    #[test]
    fn test_balance_preserves_content() {
        let mut rope = Rope::from_text("seed");
        for i in 0..200 {
            rope = rope.append(&format!("chunk {} ", i));
        }
        let balanced = rope.balance();
        assert_eq!(balanced.text(), rope.text());
        assert!(balanced.is_balanced());
        assert!(balanced.depth() <= rope.depth());
    }

    #[test]
    fn test_optimize_coalesces_leaves() {
        let mut rope = Rope::new();
        for _ in 0..100 {
            rope = rope.append("ab");
        }
        let optimized = rope.optimize();
        assert_eq!(optimized.text(), rope.text());
        assert!(optimized.leaf_count() < rope.leaf_count());
        assert!(optimized.validate().is_ok());
    }

    #[test]
    fn test_validate_ok_after_edits() {
        let mut rope = Rope::from_text("The quick brown fox");
        for i in 0..50 {
            rope = rope.insert(i % rope.len_chars().max(1), "x").unwrap();
            rope = rope.delete(0, 1).unwrap();
        }
        assert!(rope.validate().is_ok());
    }

    #[test]
    fn test_line_count_policies() {
        let terminates = Rope::from_text("a\nb\n");
        assert_eq!(terminates.line_count(), 2);

        let opens = Rope::with_policy("a\nb\n", LinePolicy::TrailingNewlineStartsNewLine);
        assert_eq!(opens.line_count(), 3);

        // Without a trailing newline both policies agree.
        assert_eq!(Rope::from_text("a\nb").line_count(), 2);
        assert_eq!(
            Rope::with_policy("a\nb", LinePolicy::TrailingNewlineStartsNewLine).line_count(),
            2
        );
    }

    #[test]
    fn test_policy_survives_edits() {
        let rope = Rope::with_policy("a\n", LinePolicy::TrailingNewlineStartsNewLine);
        let edited = rope.insert(0, "x").unwrap();
        assert_eq!(edited.line_policy(), LinePolicy::TrailingNewlineStartsNewLine);
    }

    #[test]
    fn test_char_ops() {
        let rope = Rope::from_text("hello");
        assert_eq!(rope.insert_char(5, '!').unwrap().text(), "hello!");
        assert_eq!(rope.delete_char(0).unwrap().text(), "ello");
        assert_eq!(rope.replace_char(0, 'j').unwrap().text(), "jello");
        assert!(rope.contains_char('e'));
        assert!(!rope.contains_char('z'));
        assert_eq!(rope.index_of_char('l'), Some(2));
        assert_eq!(rope.count_char('l'), 2);
    }

    #[test]
    fn test_map_filter_reverse() {
        let rope = Rope::from_text("abc");
        assert_eq!(rope.map_chars(|c| c.to_ascii_uppercase()).text(), "ABC");
        assert_eq!(rope.filter_chars(|c| c != 'b').text(), "ac");
        assert_eq!(rope.reverse_chars().text(), "cba");
    }

    #[test]
    fn test_trim() {
        let rope = Rope::from_text("  hello  ");
        assert_eq!(rope.trim_whitespace().text(), "hello");
        assert_eq!(Rope::from_text("   ").trim_whitespace().text(), "");
    }

    #[test]
    fn test_large_text_segments_into_leaves() {
        let text = "word ".repeat(2000);
        let rope = Rope::from_text(&text);
        assert!(rope.leaf_count() > 1);
        assert!(rope.is_balanced());
        assert_eq!(rope.text(), text);
        assert!(rope.validate().is_ok());
    }

    #[test]
    fn test_repeated_appends_stay_balanced() {
        let mut rope = Rope::new();
        for i in 0..500 {
            rope = rope.append(&format!("{} ", i));
        }
        assert!(rope.is_balanced(), "depth {} over cap", rope.depth());
        assert!(rope.validate().is_ok());
    }

    #[test]
    fn test_slice_rope_shares_leaves() {
        let text = "a".repeat(MAX_LEAF_BYTES * 3);
        let rope = Rope::from_text(&text);
        let sub = rope.slice_rope(0, MAX_LEAF_BYTES).unwrap();
        assert_eq!(sub.len_chars(), MAX_LEAF_BYTES);
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn test_last_char() {
        assert_eq!(Rope::from_text("ab\n").last_char(), Some('\n'));
        assert_eq!(Rope::from_text("ab").last_char(), Some('b'));
        assert_eq!(Rope::new().last_char(), None);
    }
}
