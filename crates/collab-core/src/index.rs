//! Index maps: conversions between the rope's semantic spaces.
//!
//! Every conversion descends the tree by cached summaries, so each call is
//! O(log N) worst case. Positions follow the usual conventions: conversion
//! entry points accept the one-past-the-end position (so a caret at the end
//! of the document converts cleanly), while element accessors do not.
//!
//! Line numbering is 0-based and `'\n'` is the delimiter; whether a trailing
//! newline opens an extra empty line is decided by the rope's
//! [`LinePolicy`](crate::LinePolicy), fixed at construction.

use crate::error::{Error, Result};
use crate::rope::{Node, Rope, RopeBuilder};

impl Rope {
    /// Converts a char position to its UTF-8 byte offset.
    pub fn char_to_byte(&self, pos: usize) -> Result<usize> {
        let len = self.len_chars();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "char_to_byte",
                position: pos,
                min: 0,
                max: len + 1,
            });
        }
        Ok(match self.root() {
            None => 0,
            Some(root) => char_to_byte_node(root, pos),
        })
    }

    /// Converts a byte offset to its char position.
    ///
    /// The offset must lie on a scalar-value boundary.
    pub fn byte_to_char(&self, pos: usize) -> Result<usize> {
        let len = self.len_bytes();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "byte_to_char",
                position: pos,
                min: 0,
                max: len + 1,
            });
        }
        match self.root() {
            None => Ok(0),
            Some(root) => byte_to_char_node(root, pos),
        }
    }

    /// Converts a char position to a UTF-16 code-unit offset.
    ///
    /// Scalars at or above U+10000 count as two code units.
    pub fn char_to_utf16(&self, pos: usize) -> Result<usize> {
        let len = self.len_chars();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "char_to_utf16",
                position: pos,
                min: 0,
                max: len + 1,
            });
        }
        Ok(match self.root() {
            None => 0,
            Some(root) => char_to_utf16_node(root, pos),
        })
    }

    /// Converts a UTF-16 code-unit offset to a char position.
    ///
    /// An offset landing inside a surrogate pair is rejected.
    pub fn utf16_to_char(&self, pos: usize) -> Result<usize> {
        let len = self.len_utf16();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "utf16_to_char",
                position: pos,
                min: 0,
                max: len + 1,
            });
        }
        match self.root() {
            None => Ok(0),
            Some(root) => utf16_to_char_node(root, pos),
        }
    }

    /// The 0-based line containing char position `pos`.
    ///
    /// `pos` may equal the length, in which case the final line is
    /// reported; with a trailing newline that is the line the rope's
    /// [`LinePolicy`](crate::LinePolicy) says exists there.
    pub fn char_to_line(&self, pos: usize) -> Result<usize> {
        let len = self.len_chars();
        if pos > len {
            return Err(Error::OutOfBounds {
                op: "char_to_line",
                position: pos,
                min: 0,
                max: len + 1,
            });
        }
        Ok(match self.root() {
            None => 0,
            Some(root) => {
                breaks_before(root, pos).min(self.line_count().saturating_sub(1))
            }
        })
    }

    /// The char position where line `line` starts.
    pub fn line_to_char(&self, line: usize) -> Result<usize> {
        let count = self.line_count();
        if line >= count.max(1) && !(line == 0 && count == 0) {
            return Err(Error::OutOfBounds {
                op: "line_to_char",
                position: line,
                min: 0,
                max: count,
            });
        }
        if line == 0 {
            return Ok(0);
        }
        Ok(match self.root() {
            None => 0,
            Some(root) => nth_break_end(root, line),
        })
    }

    /// Alias for [`Rope::line_to_char`].
    pub fn line_start(&self, line: usize) -> Result<usize> {
        self.line_to_char(line)
    }

    /// The char position where line `line` ends, excluding its terminator.
    pub fn line_end(&self, line: usize) -> Result<usize> {
        self.line_to_char(line)?;
        Ok(match self.root() {
            None => 0,
            Some(root) => {
                let breaks_total = root.summary().breaks;
                if line < breaks_total {
                    // The line has a terminator: its end sits right before
                    // the (line+1)-th newline.
                    nth_break_end(root, line + 1) - 1
                } else {
                    self.len_chars()
                }
            }
        })
    }

    /// Length of line `line` in chars, excluding its terminator.
    pub fn line_len(&self, line: usize) -> Result<usize> {
        let start = self.line_to_char(line)?;
        let end = self.line_end(line)?;
        Ok(end - start)
    }

    /// The text of line `line`, without its terminator.
    pub fn line(&self, line: usize) -> Result<String> {
        let start = self.line_to_char(line)?;
        let end = self.line_end(line)?;
        self.slice(start, end)
    }

    /// The text of line `line`, including its terminator when present.
    pub fn line_with_ending(&self, line: usize) -> Result<String> {
        let start = self.line_to_char(line)?;
        let end = self.line_end(line)?;
        let end = if end < self.len_chars() { end + 1 } else { end };
        self.slice(start, end)
    }

    /// Returns `true` if the content ends with `'\n'`.
    pub fn has_trailing_newline(&self) -> bool {
        self.last_char() == Some('\n')
    }

    /// Inserts `text` at the start of line `line`.
    pub fn insert_line(&self, line: usize, text: &str) -> Result<Rope> {
        let pos = self.line_to_char(line)?;
        self.insert(pos, text)
    }

    /// Removes line `line` together with its terminator.
    pub fn delete_line(&self, line: usize) -> Result<Rope> {
        let start = self.line_to_char(line)?;
        let mut end = self.line_end(line)?;
        if end < self.len_chars() {
            end += 1;
        }
        self.delete(start, end)
    }

    /// Replaces the content of line `line` (terminator untouched).
    pub fn replace_line(&self, line: usize, text: &str) -> Result<Rope> {
        let start = self.line_to_char(line)?;
        let end = self.line_end(line)?;
        self.replace(start, end, text)
    }

    /// Appends `text` as a new final line.
    pub fn append_line(&self, text: &str) -> Rope {
        if self.is_empty() {
            return self.append(text);
        }
        let mut with_break = String::with_capacity(text.len() + 1);
        with_break.push('\n');
        with_break.push_str(text);
        self.append(&with_break)
    }

    /// Prepends `text` as a new first line.
    pub fn prepend_line(&self, text: &str) -> Rope {
        if self.is_empty() {
            return self.append(text);
        }
        let mut with_break = String::with_capacity(text.len() + 1);
        with_break.push_str(text);
        with_break.push('\n');
        self.prepend(&with_break)
    }

    /// Removes every line terminator, joining all lines into one.
    pub fn join_lines(&self) -> Rope {
        self.filter_chars(|ch| ch != '\n' && ch != '\r')
    }

    /// Collects all lines (without terminators).
    pub fn split_lines(&self) -> Vec<String> {
        let count = self.line_count();
        let mut lines = Vec::with_capacity(count);
        for n in 0..count {
            match self.line(n) {
                Ok(line) => lines.push(line),
                Err(_) => break,
            }
        }
        lines
    }

    /// Prefixes every line with `prefix`.
    pub fn indent_lines(&self, prefix: &str) -> Rope {
        let mut builder = RopeBuilder::with_policy(self.line_policy());
        for n in 0..self.line_count() {
            builder.push(prefix);
            if let Ok(line) = self.line_with_ending(n) {
                builder.push(&line);
            }
        }
        builder.build()
    }

    /// Removes the common leading whitespace from every non-empty line.
    pub fn dedent_lines(&self) -> Rope {
        let lines = self.split_lines();
        let min_indent = lines
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .take_while(|&ch| ch == ' ' || ch == '\t')
                    .count()
            })
            .min()
            .unwrap_or(0);
        if min_indent == 0 {
            return self.clone();
        }
        let mut builder = RopeBuilder::with_policy(self.line_policy());
        for (n, line) in lines.iter().enumerate() {
            let cut = line
                .char_indices()
                .nth(min_indent)
                .map(|(byte, _)| byte)
                .unwrap_or(line.len());
            builder.push(&line[cut..]);
            if n + 1 < lines.len() || self.has_trailing_newline() {
                builder.push("\n");
            }
        }
        builder.build()
    }

    /// Detects the predominant line-ending style, or `None` when the
    /// content holds no terminator at all. Ties prefer LF.
    pub fn detect_line_ending(&self) -> Option<LineEnding> {
        let mut crlf = 0usize;
        let mut lf = 0usize;
        let mut cr = 0usize;
        let mut prev_cr = false;
        self.for_each_chunk(|chunk| {
            for ch in chunk.chars() {
                match ch {
                    '\n' if prev_cr => {
                        crlf += 1;
                        cr -= 1;
                        prev_cr = false;
                    }
                    '\n' => {
                        lf += 1;
                        prev_cr = false;
                    }
                    '\r' => {
                        cr += 1;
                        prev_cr = true;
                    }
                    _ => prev_cr = false,
                }
            }
        });
        if crlf == 0 && lf == 0 && cr == 0 {
            return None;
        }
        if crlf > lf && crlf >= cr {
            Some(LineEnding::Crlf)
        } else if cr > lf && cr > crlf {
            Some(LineEnding::Cr)
        } else {
            Some(LineEnding::Lf)
        }
    }

    /// Rewrites every line ending to `style`.
    pub fn normalize_line_endings(&self, style: LineEnding) -> Rope {
        let mut builder = RopeBuilder::with_policy(self.line_policy());
        let mut prev_cr = false;
        self.for_each_chunk(|chunk| {
            for ch in chunk.chars() {
                match ch {
                    '\r' => {
                        if prev_cr {
                            builder.push(style.as_str());
                        }
                        prev_cr = true;
                    }
                    '\n' => {
                        builder.push(style.as_str());
                        prev_cr = false;
                    }
                    other => {
                        if prev_cr {
                            builder.push(style.as_str());
                            prev_cr = false;
                        }
                        builder.push_char(other);
                    }
                }
            }
        });
        if prev_cr {
            builder.push(style.as_str());
        }
        builder.build()
    }
}

/// A line-ending style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac CR (`'\r'`).
    Cr,
}

impl LineEnding {
    /// The terminator as a string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Parses a terminator string; anything other than `"\n"`, `"\r\n"` or
    /// `"\r"` is rejected.
    pub fn parse(style: &str) -> Result<Self> {
        match style {
            "\n" => Ok(LineEnding::Lf),
            "\r\n" => Ok(LineEnding::Crlf),
            "\r" => Ok(LineEnding::Cr),
            other => Err(Error::InvalidInput {
                parameter: "style",
                reason: "must be \\n, \\r\\n, or \\r",
                value: format!("{:?}", other),
            }),
        }
    }
}

// ========== Summary-guided descents ==========

fn char_to_byte_node(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf { text, .. } => text
            .char_indices()
            .nth(pos)
            .map(|(byte, _)| byte)
            .unwrap_or(text.len()),
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos <= left_summary.chars {
                // A position exactly at the seam resolves in the left
                // subtree, which reports its full byte length.
                if pos == left_summary.chars {
                    left_summary.bytes
                } else {
                    char_to_byte_node(left, pos)
                }
            } else {
                left_summary.bytes + char_to_byte_node(right, pos - left_summary.chars)
            }
        }
    }
}

fn byte_to_char_node(node: &Node, pos: usize) -> Result<usize> {
    match node {
        Node::Leaf { text, summary } => {
            if pos == text.len() {
                return Ok(summary.chars);
            }
            if !text.is_char_boundary(pos) {
                return Err(Error::InvalidInput {
                    parameter: "pos",
                    reason: "byte offset is not on a scalar boundary",
                    value: pos.to_string(),
                });
            }
            Ok(text[..pos].chars().count())
        }
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos <= left_summary.bytes {
                if pos == left_summary.bytes {
                    Ok(left_summary.chars)
                } else {
                    byte_to_char_node(left, pos)
                }
            } else {
                Ok(left_summary.chars + byte_to_char_node(right, pos - left_summary.bytes)?)
            }
        }
    }
}

fn char_to_utf16_node(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf { text, .. } => text.chars().take(pos).map(char::len_utf16).sum(),
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos <= left_summary.chars {
                if pos == left_summary.chars {
                    left_summary.utf16
                } else {
                    char_to_utf16_node(left, pos)
                }
            } else {
                left_summary.utf16 + char_to_utf16_node(right, pos - left_summary.chars)
            }
        }
    }
}

fn utf16_to_char_node(node: &Node, pos: usize) -> Result<usize> {
    match node {
        Node::Leaf { text, summary } => {
            if pos == summary.utf16 {
                return Ok(summary.chars);
            }
            let mut units = 0;
            for (chars, ch) in text.chars().enumerate() {
                if units == pos {
                    return Ok(chars);
                }
                if units > pos {
                    break;
                }
                units += ch.len_utf16();
            }
            if units == pos {
                return Ok(summary.chars);
            }
            Err(Error::InvalidInput {
                parameter: "pos",
                reason: "UTF-16 offset lands inside a surrogate pair",
                value: pos.to_string(),
            })
        }
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos <= left_summary.utf16 {
                if pos == left_summary.utf16 {
                    Ok(left_summary.chars)
                } else {
                    utf16_to_char_node(left, pos)
                }
            } else {
                Ok(left_summary.chars + utf16_to_char_node(right, pos - left_summary.utf16)?)
            }
        }
    }
}

/// Number of `'\n'` in the char range `[0, pos)`.
fn breaks_before(node: &Node, pos: usize) -> usize {
    match node {
        Node::Leaf { text, .. } => text.chars().take(pos).filter(|&ch| ch == '\n').count(),
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if pos <= left_summary.chars {
                if pos == left_summary.chars {
                    left_summary.breaks
                } else {
                    breaks_before(left, pos)
                }
            } else {
                left_summary.breaks + breaks_before(right, pos - left_summary.chars)
            }
        }
    }
}

/// Char position just after the `n`-th newline (1-based `n`); the caller
/// guarantees the tree holds at least `n` newlines.
fn nth_break_end(node: &Node, n: usize) -> usize {
    match node {
        Node::Leaf { text, .. } => {
            let mut seen = 0;
            for (chars, ch) in text.chars().enumerate() {
                if ch == '\n' {
                    seen += 1;
                    if seen == n {
                        return chars + 1;
                    }
                }
            }
            text.chars().count()
        }
        Node::Branch {
            left,
            right,
            left_summary,
            ..
        } => {
            if n <= left_summary.breaks {
                nth_break_end(left, n)
            } else {
                left_summary.chars + nth_break_end(right, n - left_summary.breaks)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rope::LinePolicy;

    #[test]
    fn test_char_byte_round_trip() {
        let rope = Rope::from_text("a日b本c");
        for pos in 0..=rope.len_chars() {
            let byte = rope.char_to_byte(pos).unwrap();
            assert_eq!(rope.byte_to_char(byte).unwrap(), pos);
        }
    }

    #[test]
    fn test_byte_to_char_rejects_interior_byte() {
        let rope = Rope::from_text("日");
        assert!(matches!(
            rope.byte_to_char(1),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_char_utf16_round_trip() {
        // 'H', 'i', '👋' (2 UTF-16 units).
        let rope = Rope::from_text("Hi👋");
        assert_eq!(rope.len_chars(), 3);
        assert_eq!(rope.len_utf16(), 4);
        assert_eq!(rope.char_to_utf16(2).unwrap(), 2);
        assert_eq!(rope.char_to_utf16(3).unwrap(), 4);
        assert_eq!(rope.utf16_to_char(4).unwrap(), 3);
        for pos in 0..=rope.len_chars() {
            let units = rope.char_to_utf16(pos).unwrap();
            assert_eq!(rope.utf16_to_char(units).unwrap(), pos);
        }
    }

    #[test]
    fn test_utf16_inside_surrogate_pair() {
        let rope = Rope::from_text("👋");
        assert!(matches!(
            rope.utf16_to_char(1),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_line_conversions() {
        let rope = Rope::from_text("Line 1\nLine 2\nLine 3");
        assert_eq!(rope.line_count(), 3);
        assert_eq!(rope.line_to_char(0).unwrap(), 0);
        assert_eq!(rope.line_to_char(1).unwrap(), 7);
        assert_eq!(rope.line_to_char(2).unwrap(), 14);
        assert_eq!(rope.char_to_line(0).unwrap(), 0);
        assert_eq!(rope.char_to_line(6).unwrap(), 0);
        assert_eq!(rope.char_to_line(7).unwrap(), 1);
        assert_eq!(rope.char_to_line(rope.len_chars()).unwrap(), 2);
        assert_eq!(rope.line_end(0).unwrap(), 6);
        assert_eq!(rope.line_end(2).unwrap(), rope.len_chars());
        assert!(rope.line_to_char(3).is_err());
    }

    #[test]
    fn test_line_text_access() {
        let rope = Rope::from_text("alpha\nbeta\ngamma");
        assert_eq!(rope.line(0).unwrap(), "alpha");
        assert_eq!(rope.line(1).unwrap(), "beta");
        assert_eq!(rope.line(2).unwrap(), "gamma");
        assert_eq!(rope.line_with_ending(0).unwrap(), "alpha\n");
        assert_eq!(rope.line_with_ending(2).unwrap(), "gamma");
        assert_eq!(rope.line_len(1).unwrap(), 4);
    }

    #[test]
    fn test_line_round_trip_law() {
        let rope = Rope::from_text("ab\ncdef\n\ngh");
        for pos in 0..rope.len_chars() {
            let line = rope.char_to_line(pos).unwrap();
            let start = rope.line_to_char(line).unwrap();
            assert!(start <= pos, "start {} > pos {}", start, pos);
            if line + 1 < rope.line_count() {
                let next = rope.line_to_char(line + 1).unwrap();
                assert!(pos < next, "pos {} not before next line start {}", pos, next);
            }
        }
    }

    #[test]
    fn test_line_edits() {
        let rope = Rope::from_text("one\ntwo\nthree");
        assert_eq!(rope.delete_line(1).unwrap().text(), "one\nthree");
        assert_eq!(rope.replace_line(1, "TWO").unwrap().text(), "one\nTWO\nthree");
        assert_eq!(rope.insert_line(1, "x\n").unwrap().text(), "one\nx\ntwo\nthree");
        assert_eq!(rope.append_line("four").text(), "one\ntwo\nthree\nfour");
        assert_eq!(rope.prepend_line("zero").text(), "zero\none\ntwo\nthree");
    }

    #[test]
    fn test_append_line_to_empty() {
        assert_eq!(Rope::new().append_line("first").text(), "first");
    }

    #[test]
    fn test_join_and_split_lines() {
        let rope = Rope::from_text("a\nb\nc");
        assert_eq!(rope.join_lines().text(), "abc");
        assert_eq!(rope.split_lines(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_indent_dedent() {
        let rope = Rope::from_text("fn main() {\n    body\n}");
        let indented = rope.indent_lines("    ");
        assert_eq!(indented.text(), "    fn main() {\n        body\n    }");

        let padded = Rope::from_text("  a\n    b\n  c");
        assert_eq!(padded.dedent_lines().text(), "a\n  b\nc");
    }

    #[test]
    fn test_detect_line_ending() {
        assert_eq!(
            Rope::from_text("a\nb\nc").detect_line_ending(),
            Some(LineEnding::Lf)
        );
        assert_eq!(
            Rope::from_text("a\r\nb\r\nc\n").detect_line_ending(),
            Some(LineEnding::Crlf)
        );
        assert_eq!(
            Rope::from_text("a\rb\rc").detect_line_ending(),
            Some(LineEnding::Cr)
        );
        assert_eq!(Rope::from_text("abc").detect_line_ending(), None);
    }

    #[test]
    fn test_normalize_line_endings() {
        let rope = Rope::from_text("a\r\nb\rc\nd");
        assert_eq!(
            rope.normalize_line_endings(LineEnding::Lf).text(),
            "a\nb\nc\nd"
        );
        assert_eq!(
            rope.normalize_line_endings(LineEnding::Crlf).text(),
            "a\r\nb\r\nc\r\nd"
        );
    }

    #[test]
    fn test_line_ending_parse() {
        assert_eq!(LineEnding::parse("\n").unwrap(), LineEnding::Lf);
        assert_eq!(LineEnding::parse("\r\n").unwrap(), LineEnding::Crlf);
        assert!(matches!(
            LineEnding::parse("\n\n"),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_char_to_line_at_end_respects_policy() {
        // At the end of "a\n" the terminates policy has only line 0, while
        // the trailing-newline policy has an empty line 1.
        let terminates = Rope::from_text("a\n");
        assert_eq!(terminates.char_to_line(2).unwrap(), 0);

        let opens = Rope::with_policy("a\n", LinePolicy::TrailingNewlineStartsNewLine);
        assert_eq!(opens.char_to_line(2).unwrap(), 1);
    }

    #[test]
    fn test_trailing_newline_policy_in_line_access() {
        let opens = Rope::with_policy("a\n", LinePolicy::TrailingNewlineStartsNewLine);
        assert_eq!(opens.line_count(), 2);
        assert_eq!(opens.line_to_char(1).unwrap(), 2);
        assert_eq!(opens.line(1).unwrap(), "");

        let terminates = Rope::from_text("a\n");
        assert_eq!(terminates.line_count(), 1);
        assert!(terminates.line_to_char(1).is_err());
    }

    #[test]
    fn test_conversions_cross_leaf_boundaries() {
        // Force a multi-leaf rope with multi-byte chars spread across it.
        let chunk = "日本語テキスト\n";
        let text = chunk.repeat(200);
        let rope = Rope::from_text(&text);
        assert!(rope.leaf_count() > 1);
        for pos in (0..rope.len_chars()).step_by(37) {
            let byte = rope.char_to_byte(pos).unwrap();
            assert_eq!(rope.byte_to_char(byte).unwrap(), pos);
            let units = rope.char_to_utf16(pos).unwrap();
            assert_eq!(rope.utf16_to_char(units).unwrap(), pos);
        }
        assert_eq!(rope.line_count(), 200);
        assert_eq!(rope.line_to_char(100).unwrap(), 100 * chunk.chars().count());
    }
}
