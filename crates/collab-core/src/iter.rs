//! Iterators over rope content.
//!
//! Every iterator is a small value holding a cheap clone of the rope it was
//! created from; ropes are immutable, so iterators can never be invalidated.
//!
//! The stepping protocol follows the explicit `next()`/`current()` shape:
//! `next()` returns `true` when an element became current, and `current()`
//! is only valid between a successful `next()` and exhaustion — calling it
//! before the first step or after exhaustion yields an
//! [`Error::IteratorState`]. After exhaustion, `next()` keeps returning
//! `false`.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::rope::{byte_of_char, Node, Rope};

/// Lifecycle of a stepping iterator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IterState {
    NotStarted,
    Active,
    Exhausted,
}

fn current_err(state: IterState) -> Error {
    match state {
        IterState::NotStarted => Error::IteratorState {
            op: "current",
            reason: "next() has not been called",
        },
        _ => Error::IteratorState {
            op: "current",
            reason: "iterator exhausted",
        },
    }
}

/// Which segmentation rules grapheme and word iteration use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentationMode {
    /// UAX #29 extended grapheme clusters / word boundaries.
    #[default]
    Unicode,
    /// Fallback rules: every scalar is its own cluster; words are maximal
    /// runs that are neither whitespace nor ASCII punctuation.
    Fallback,
}

/// Owning in-order cursor over leaf chunks.
#[derive(Clone)]
struct ChunkCursor {
    stack: Vec<Arc<Node>>,
}

impl ChunkCursor {
    fn new(rope: &Rope) -> Self {
        let mut cursor = ChunkCursor { stack: Vec::new() };
        if let Some(root) = rope.root() {
            cursor.descend(root.clone());
        }
        cursor
    }

    fn descend(&mut self, mut node: Arc<Node>) {
        loop {
            match &*node {
                Node::Leaf { .. } => {
                    self.stack.push(node);
                    return;
                }
                Node::Branch { left, right, .. } => {
                    self.stack.push(right.clone());
                    let next = left.clone();
                    node = next;
                }
            }
        }
    }

    fn next_chunk(&mut self) -> Option<Arc<str>> {
        let node = self.stack.pop()?;
        match &*node {
            Node::Leaf { text, .. } => Some(text.clone()),
            Node::Branch { .. } => {
                self.descend(node);
                match self.stack.pop().as_deref() {
                    Some(Node::Leaf { text, .. }) => Some(text.clone()),
                    _ => None,
                }
            }
        }
    }
}

/// Positions a forward cursor at `char_pos`, returning the pending-subtree
/// stack, the leaf containing the position and the byte offset inside it.
fn seek_forward(rope: &Rope, mut char_pos: usize) -> (ChunkCursor, Option<Arc<str>>, usize) {
    let mut cursor = ChunkCursor { stack: Vec::new() };
    let Some(root) = rope.root() else {
        return (cursor, None, 0);
    };
    let mut node = root.clone();
    loop {
        match &*node {
            Node::Leaf { text, summary } => {
                if char_pos >= summary.chars {
                    // Position is one past this leaf; the next chunk (if
                    // any) is already on the stack.
                    return (cursor, Some(text.clone()), text.len());
                }
                let byte = byte_of_char(text, char_pos);
                return (cursor, Some(text.clone()), byte);
            }
            Node::Branch {
                left,
                right,
                left_summary,
                ..
            } => {
                if char_pos < left_summary.chars {
                    cursor.stack.push(right.clone());
                    let next = left.clone();
                    node = next;
                } else {
                    char_pos -= left_summary.chars;
                    let next = right.clone();
                    node = next;
                }
            }
        }
    }
}

// ========== Forward rune iterator ==========

/// Forward iterator over Unicode scalar values.
pub struct Chars {
    rope: Rope,
    cursor: ChunkCursor,
    chunk: Option<Arc<str>>,
    chunk_byte: usize,
    position: usize,
    current: Option<char>,
    state: IterState,
}

impl Chars {
    pub(crate) fn new(rope: Rope) -> Self {
        let cursor = ChunkCursor::new(&rope);
        Chars {
            rope,
            cursor,
            chunk: None,
            chunk_byte: 0,
            position: 0,
            current: None,
            state: IterState::NotStarted,
        }
    }

    /// Advances to the next scalar; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }
        loop {
            if let Some(chunk) = &self.chunk {
                if self.chunk_byte < chunk.len() {
                    let ch = match chunk[self.chunk_byte..].chars().next() {
                        Some(ch) => ch,
                        None => {
                            self.state = IterState::Exhausted;
                            return false;
                        }
                    };
                    self.chunk_byte += ch.len_utf8();
                    if self.state == IterState::Active {
                        self.position += 1;
                    }
                    self.state = IterState::Active;
                    self.current = Some(ch);
                    return true;
                }
            }
            match self.cursor.next_chunk() {
                Some(chunk) => {
                    self.chunk = Some(chunk);
                    self.chunk_byte = 0;
                }
                None => {
                    self.state = IterState::Exhausted;
                    self.current = None;
                    return false;
                }
            }
        }
    }

    /// The current scalar value.
    pub fn current(&self) -> Result<char> {
        self.current.ok_or(current_err(self.state))
    }

    /// Char index of the current scalar.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Looks at the next scalar without advancing.
    pub fn peek(&self) -> Option<char> {
        if self.state == IterState::Exhausted {
            return None;
        }
        if let Some(chunk) = &self.chunk {
            if self.chunk_byte < chunk.len() {
                return chunk[self.chunk_byte..].chars().next();
            }
        }
        let mut cursor = self.cursor.clone();
        cursor.next_chunk().and_then(|chunk| chunk.chars().next())
    }

    /// Returns `true` if another scalar is available.
    pub fn has_next(&self) -> bool {
        self.peek().is_some()
    }

    /// Returns `true` once the iterator has run off the end.
    pub fn is_exhausted(&self) -> bool {
        self.state == IterState::Exhausted
    }

    /// Rewinds to the initial state.
    pub fn reset(&mut self) {
        *self = Chars::new(self.rope.clone());
    }

    /// Advances by up to `n` scalars, returning how many were skipped.
    pub fn skip_n(&mut self, n: usize) -> usize {
        let mut skipped = 0;
        while skipped < n && self.next() {
            skipped += 1;
        }
        skipped
    }

    /// Repositions so the next `next()` yields the scalar at `pos`.
    ///
    /// Returns `false` (leaving the iterator untouched) when `pos` is out
    /// of bounds.
    pub fn seek(&mut self, pos: usize) -> bool {
        if pos >= self.rope.len_chars() {
            return false;
        }
        let (cursor, chunk, byte) = seek_forward(&self.rope, pos);
        self.cursor = cursor;
        self.chunk = chunk;
        self.chunk_byte = byte;
        self.current = None;
        if pos == 0 {
            self.state = IterState::NotStarted;
            self.position = 0;
        } else {
            // Mid-stream seek: the next advance lands on `pos` exactly.
            self.state = IterState::Active;
            self.position = pos - 1;
        }
        true
    }

    /// Steps back to the previous scalar; `false` at the beginning.
    pub fn previous(&mut self) -> bool {
        if self.state != IterState::Active || self.position == 0 {
            return false;
        }
        let target = self.position - 1;
        if !self.seek(target) {
            return false;
        }
        self.next()
    }

    /// Returns `true` if a previous scalar exists.
    pub fn has_previous(&self) -> bool {
        self.state == IterState::Active && self.position > 0
    }

    /// Collects every remaining scalar, exhausting the iterator.
    pub fn collect_remaining(&mut self) -> Vec<char> {
        let mut out = Vec::new();
        while self.next() {
            if let Some(ch) = self.current {
                out.push(ch);
            }
        }
        out
    }
}

// ========== Reverse rune iterator ==========

/// Reverse iterator over Unicode scalar values.
pub struct CharsRev {
    rope: Rope,
    stack: Vec<Arc<Node>>,
    chunk: Option<Arc<str>>,
    chunk_end: usize,
    /// Char index one past the next element to yield.
    remaining: usize,
    current: Option<char>,
    state: IterState,
}

impl CharsRev {
    pub(crate) fn new(rope: Rope) -> Self {
        let mut iter = CharsRev {
            remaining: rope.len_chars(),
            rope,
            stack: Vec::new(),
            chunk: None,
            chunk_end: 0,
            current: None,
            state: IterState::NotStarted,
        };
        let root = iter.rope.root().cloned();
        if let Some(root) = root {
            iter.descend(root);
        }
        iter
    }

    fn descend(&mut self, mut node: Arc<Node>) {
        loop {
            match &*node {
                Node::Leaf { .. } => {
                    self.stack.push(node);
                    return;
                }
                Node::Branch { left, right, .. } => {
                    self.stack.push(left.clone());
                    let next = right.clone();
                    node = next;
                }
            }
        }
    }

    fn next_chunk_back(&mut self) -> Option<Arc<str>> {
        let node = self.stack.pop()?;
        match &*node {
            Node::Leaf { text, .. } => Some(text.clone()),
            Node::Branch { .. } => {
                self.descend(node);
                match self.stack.pop().as_deref() {
                    Some(Node::Leaf { text, .. }) => Some(text.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Advances backwards; `false` once the beginning is passed.
    pub fn next(&mut self) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }
        loop {
            if let Some(chunk) = &self.chunk {
                if self.chunk_end > 0 {
                    let ch = match chunk[..self.chunk_end].chars().next_back() {
                        Some(ch) => ch,
                        None => {
                            self.state = IterState::Exhausted;
                            return false;
                        }
                    };
                    self.chunk_end -= ch.len_utf8();
                    self.remaining -= 1;
                    self.state = IterState::Active;
                    self.current = Some(ch);
                    return true;
                }
            }
            match self.next_chunk_back() {
                Some(chunk) => {
                    self.chunk_end = chunk.len();
                    self.chunk = Some(chunk);
                }
                None => {
                    self.state = IterState::Exhausted;
                    self.current = None;
                    return false;
                }
            }
        }
    }

    /// The current scalar value.
    pub fn current(&self) -> Result<char> {
        self.current.ok_or(current_err(self.state))
    }

    /// Char index of the current scalar, counted from the rope's start.
    pub fn position_from_start(&self) -> usize {
        self.remaining
    }

    /// Returns `true` once the iterator has run off the beginning.
    pub fn is_exhausted(&self) -> bool {
        self.state == IterState::Exhausted
    }

    /// Rewinds to the initial state (the rope's end).
    pub fn reset(&mut self) {
        *self = CharsRev::new(self.rope.clone());
    }

    /// Repositions so the next `next()` yields the scalar at `pos`
    /// (continuing toward the start). `false` when out of bounds.
    pub fn seek_from_start(&mut self, pos: usize) -> bool {
        if pos >= self.rope.len_chars() {
            return false;
        }
        let boundary = pos + 1;
        self.stack.clear();
        self.chunk = None;
        self.chunk_end = 0;
        self.current = None;
        self.state = IterState::NotStarted;
        self.remaining = boundary;
        let Some(root) = self.rope.root() else {
            return false;
        };
        let mut node = root.clone();
        let mut target = boundary;
        loop {
            match &*node {
                Node::Leaf { text, .. } => {
                    self.chunk_end = byte_of_char(text, target);
                    self.chunk = Some(text.clone());
                    return true;
                }
                Node::Branch {
                    left,
                    right,
                    left_summary,
                    ..
                } => {
                    if target <= left_summary.chars {
                        let next = left.clone();
                        node = next;
                    } else {
                        self.stack.push(left.clone());
                        target -= left_summary.chars;
                        let next = right.clone();
                        node = next;
                    }
                }
            }
        }
    }

    /// Steps backward by up to `n` scalars; `false` if fewer were available.
    pub fn skip_n(&mut self, n: usize) -> bool {
        for _ in 0..n {
            if !self.next() {
                return false;
            }
        }
        true
    }
}

// ========== Byte iterator ==========

/// Forward iterator over UTF-8 bytes.
pub struct Bytes {
    rope: Rope,
    cursor: ChunkCursor,
    chunk: Option<Arc<str>>,
    chunk_byte: usize,
    position: usize,
    current: Option<u8>,
    state: IterState,
}

impl Bytes {
    pub(crate) fn new(rope: Rope) -> Self {
        let cursor = ChunkCursor::new(&rope);
        Bytes {
            rope,
            cursor,
            chunk: None,
            chunk_byte: 0,
            position: 0,
            current: None,
            state: IterState::NotStarted,
        }
    }

    /// Advances to the next byte; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }
        loop {
            if let Some(chunk) = &self.chunk {
                if let Some(&byte) = chunk.as_bytes().get(self.chunk_byte) {
                    self.chunk_byte += 1;
                    if self.state == IterState::Active {
                        self.position += 1;
                    }
                    self.state = IterState::Active;
                    self.current = Some(byte);
                    return true;
                }
            }
            match self.cursor.next_chunk() {
                Some(chunk) => {
                    self.chunk = Some(chunk);
                    self.chunk_byte = 0;
                }
                None => {
                    self.state = IterState::Exhausted;
                    self.current = None;
                    return false;
                }
            }
        }
    }

    /// The current byte.
    pub fn current(&self) -> Result<u8> {
        self.current.ok_or(current_err(self.state))
    }

    /// Byte index of the current byte.
    pub fn byte_position(&self) -> usize {
        self.position
    }

    /// Looks at the next byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        if self.state == IterState::Exhausted {
            return None;
        }
        if let Some(chunk) = &self.chunk {
            if let Some(&byte) = chunk.as_bytes().get(self.chunk_byte) {
                return Some(byte);
            }
        }
        let mut cursor = self.cursor.clone();
        cursor
            .next_chunk()
            .and_then(|chunk| chunk.as_bytes().first().copied())
    }

    /// Returns `true` if [`Bytes::peek`] would succeed.
    pub fn has_peek(&self) -> bool {
        self.peek().is_some()
    }

    /// Rewinds to the initial state.
    pub fn reset(&mut self) {
        *self = Bytes::new(self.rope.clone());
    }

    /// Repositions so the next `next()` yields the byte at `byte_idx`.
    /// `false` when out of bounds.
    pub fn seek(&mut self, byte_idx: usize) -> bool {
        if byte_idx >= self.rope.len_bytes() {
            return false;
        }
        // Byte seeks may land inside a scalar; the byte iterator does not
        // care about scalar boundaries, so descend by byte weight.
        let Some(root) = self.rope.root() else {
            return false;
        };
        self.cursor.stack.clear();
        let mut node = root.clone();
        let mut target = byte_idx;
        loop {
            match &*node {
                Node::Leaf { text, .. } => {
                    self.chunk = Some(text.clone());
                    self.chunk_byte = target;
                    break;
                }
                Node::Branch {
                    left,
                    right,
                    left_summary,
                    ..
                } => {
                    if target < left_summary.bytes {
                        self.cursor.stack.push(right.clone());
                        let next = left.clone();
                        node = next;
                    } else {
                        target -= left_summary.bytes;
                        let next = right.clone();
                        node = next;
                    }
                }
            }
        }
        self.current = None;
        if byte_idx == 0 {
            self.state = IterState::NotStarted;
            self.position = 0;
        } else {
            self.state = IterState::Active;
            self.position = byte_idx - 1;
        }
        true
    }
}

// ========== Chunk iterator ==========

/// Iterator over the rope's leaves, yielding each chunk's text in order.
pub struct Chunks {
    cursor: ChunkCursor,
    current: Option<Arc<str>>,
    char_offset: usize,
    byte_offset: usize,
    next_char_offset: usize,
    next_byte_offset: usize,
    state: IterState,
}

impl Chunks {
    pub(crate) fn new(rope: Rope) -> Self {
        Chunks {
            cursor: ChunkCursor::new(&rope),
            current: None,
            char_offset: 0,
            byte_offset: 0,
            next_char_offset: 0,
            next_byte_offset: 0,
            state: IterState::NotStarted,
        }
    }

    /// Advances to the next chunk; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }
        match self.cursor.next_chunk() {
            Some(chunk) => {
                self.char_offset = self.next_char_offset;
                self.byte_offset = self.next_byte_offset;
                self.next_char_offset += chunk.chars().count();
                self.next_byte_offset += chunk.len();
                self.current = Some(chunk);
                self.state = IterState::Active;
                true
            }
            None => {
                self.current = None;
                self.state = IterState::Exhausted;
                false
            }
        }
    }

    /// The current chunk's text.
    pub fn current(&self) -> Result<&str> {
        match &self.current {
            Some(chunk) => Ok(chunk),
            None => Err(current_err(self.state)),
        }
    }

    /// Char position of the current chunk's first scalar.
    pub fn char_offset(&self) -> usize {
        self.char_offset
    }

    /// Byte position of the current chunk's first byte.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }
}

// ========== Line iterator ==========

/// Iterator over lines.
pub struct Lines {
    rope: Rope,
    line: usize,
    count: usize,
    with_endings: bool,
    state: IterState,
}

impl Lines {
    pub(crate) fn new(rope: Rope) -> Self {
        Lines {
            count: rope.line_count(),
            rope,
            line: 0,
            with_endings: false,
            state: IterState::NotStarted,
        }
    }

    /// Yields each line including its terminator.
    pub fn with_endings(mut self) -> Self {
        self.with_endings = true;
        self
    }

    /// Advances to the next line; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        match self.state {
            IterState::NotStarted => {
                if self.count == 0 {
                    self.state = IterState::Exhausted;
                    return false;
                }
                self.state = IterState::Active;
                self.line = 0;
                true
            }
            IterState::Active => {
                if self.line + 1 >= self.count {
                    self.state = IterState::Exhausted;
                    return false;
                }
                self.line += 1;
                true
            }
            IterState::Exhausted => false,
        }
    }

    /// The current line's text.
    pub fn current(&self) -> Result<String> {
        if self.state != IterState::Active {
            return Err(current_err(self.state));
        }
        if self.with_endings {
            self.rope.line_with_ending(self.line)
        } else {
            self.rope.line(self.line)
        }
    }

    /// 0-based number of the current line.
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Rewinds to the first line.
    pub fn reset(&mut self) {
        self.line = 0;
        self.state = IterState::NotStarted;
    }

    /// Collects every remaining line.
    pub fn collect_remaining(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while self.next() {
            lines.push(self.current()?);
        }
        Ok(lines)
    }
}

// ========== Grapheme iterator ==========

/// Iterator over extended grapheme clusters.
///
/// Clusters can span leaf boundaries, so the iterator works over a
/// materialized copy of the text taken at construction time.
pub struct Graphemes {
    text: String,
    byte: usize,
    position: usize,
    current: Option<String>,
    current_chars: usize,
    mode: SegmentationMode,
    state: IterState,
}

impl Graphemes {
    pub(crate) fn new(rope: &Rope, mode: SegmentationMode) -> Self {
        Graphemes {
            text: rope.text(),
            byte: 0,
            position: 0,
            current: None,
            current_chars: 0,
            mode,
            state: IterState::NotStarted,
        }
    }

    /// Advances to the next cluster; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        if self.state == IterState::Exhausted {
            return false;
        }
        let rest = &self.text[self.byte..];
        let cluster = match self.mode {
            SegmentationMode::Unicode => rest.graphemes(true).next(),
            SegmentationMode::Fallback => rest.chars().next().map(|ch| &rest[..ch.len_utf8()]),
        };
        match cluster {
            Some(cluster) => {
                if self.state == IterState::Active {
                    self.position += self.current_chars;
                }
                self.state = IterState::Active;
                self.byte += cluster.len();
                self.current_chars = cluster.chars().count();
                self.current = Some(cluster.to_string());
                true
            }
            None => {
                self.state = IterState::Exhausted;
                self.current = None;
                false
            }
        }
    }

    /// The current cluster's text.
    pub fn current(&self) -> Result<&str> {
        match &self.current {
            Some(cluster) => Ok(cluster),
            None => Err(current_err(self.state)),
        }
    }

    /// Char position of the current cluster's first scalar.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewinds to the beginning.
    pub fn reset(&mut self) {
        self.byte = 0;
        self.position = 0;
        self.current = None;
        self.current_chars = 0;
        self.state = IterState::NotStarted;
    }
}

// ========== Word boundaries ==========

/// A word's half-open char range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    /// Char position of the word's first scalar.
    pub start: usize,
    /// Char position one past the word's last scalar.
    pub end: usize,
}

/// Iterator over word start/end positions.
pub struct WordBoundaries {
    spans: Vec<WordSpan>,
    index: usize,
    state: IterState,
}

impl WordBoundaries {
    pub(crate) fn new(rope: &Rope, mode: SegmentationMode) -> Self {
        WordBoundaries {
            spans: word_spans(rope, mode),
            index: 0,
            state: IterState::NotStarted,
        }
    }

    /// Advances to the next word; `false` once exhausted.
    pub fn next(&mut self) -> bool {
        match self.state {
            IterState::NotStarted => {
                if self.spans.is_empty() {
                    self.state = IterState::Exhausted;
                    return false;
                }
                self.state = IterState::Active;
                self.index = 0;
                true
            }
            IterState::Active => {
                if self.index + 1 >= self.spans.len() {
                    self.state = IterState::Exhausted;
                    return false;
                }
                self.index += 1;
                true
            }
            IterState::Exhausted => false,
        }
    }

    /// The current word span.
    pub fn current(&self) -> Result<WordSpan> {
        if self.state != IterState::Active {
            return Err(current_err(self.state));
        }
        Ok(self.spans[self.index])
    }

    /// Rewinds to the first word.
    pub fn reset(&mut self) {
        self.index = 0;
        self.state = IterState::NotStarted;
    }
}

fn is_simple_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !(ch.is_ascii() && ch.is_ascii_punctuation())
}

/// Computes all word spans (char positions) in `rope`.
pub(crate) fn word_spans(rope: &Rope, mode: SegmentationMode) -> Vec<WordSpan> {
    let text = rope.text();
    let mut spans = Vec::new();
    match mode {
        SegmentationMode::Unicode => {
            let mut char_pos = 0;
            let mut last_byte = 0;
            for (byte, segment) in text.split_word_bound_indices() {
                char_pos += text[last_byte..byte].chars().count();
                last_byte = byte;
                if segment.chars().any(|ch| ch.is_alphanumeric() || ch == '_') {
                    spans.push(WordSpan {
                        start: char_pos,
                        end: char_pos + segment.chars().count(),
                    });
                }
            }
        }
        SegmentationMode::Fallback => {
            let mut start = None;
            let mut pos = 0;
            for ch in text.chars() {
                if is_simple_word_char(ch) {
                    if start.is_none() {
                        start = Some(pos);
                    }
                } else if let Some(from) = start.take() {
                    spans.push(WordSpan { start: from, end: pos });
                }
                pos += 1;
            }
            if let Some(from) = start {
                spans.push(WordSpan { start: from, end: pos });
            }
        }
    }
    spans
}

/// Char position of the start of the word at or before `pos`; 0 when no
/// word starts earlier.
pub fn prev_word_start(rope: &Rope, pos: usize) -> usize {
    word_spans(rope, SegmentationMode::Unicode)
        .iter()
        .rev()
        .find(|span| span.start <= pos)
        .map(|span| span.start)
        .unwrap_or(0)
}

/// Char position of the start of the first word after `pos`; the rope's
/// char length when none follows.
pub fn next_word_start(rope: &Rope, pos: usize) -> usize {
    word_spans(rope, SegmentationMode::Unicode)
        .iter()
        .find(|span| span.start > pos)
        .map(|span| span.start)
        .unwrap_or_else(|| rope.len_chars())
}

// ========== Rope entry points ==========

impl Rope {
    /// Forward scalar iterator.
    pub fn chars(&self) -> Chars {
        Chars::new(self.clone())
    }

    /// Reverse scalar iterator.
    pub fn chars_rev(&self) -> CharsRev {
        CharsRev::new(self.clone())
    }

    /// Byte iterator.
    pub fn bytes_iter(&self) -> Bytes {
        Bytes::new(self.clone())
    }

    /// Leaf chunk iterator.
    pub fn chunks(&self) -> Chunks {
        Chunks::new(self.clone())
    }

    /// Line iterator (terminators excluded; see [`Lines::with_endings`]).
    pub fn lines(&self) -> Lines {
        Lines::new(self.clone())
    }

    /// Grapheme cluster iterator using UAX #29 rules.
    pub fn graphemes(&self) -> Graphemes {
        Graphemes::new(self, SegmentationMode::Unicode)
    }

    /// Grapheme cluster iterator with an explicit segmentation mode.
    pub fn graphemes_with_mode(&self, mode: SegmentationMode) -> Graphemes {
        Graphemes::new(self, mode)
    }

    /// Word boundary iterator using UAX #29 rules.
    pub fn word_boundaries(&self) -> WordBoundaries {
        WordBoundaries::new(self, SegmentationMode::Unicode)
    }

    /// Word boundary iterator with an explicit segmentation mode.
    pub fn word_boundaries_with_mode(&self, mode: SegmentationMode) -> WordBoundaries {
        WordBoundaries::new(self, mode)
    }
}
