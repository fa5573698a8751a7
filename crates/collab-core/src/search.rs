//! Text search over rope content.
//!
//! Literal queries (the default) never materialize the document: they
//! stream the rope's chunk-backed char iterator and compare scalar by
//! scalar, so results fall out directly in character offsets. Whole-word
//! filtering reads the neighbouring scalars through the rope's O(log n)
//! accessors.
//!
//! Regex queries need a contiguous haystack for the regex engine, so they
//! copy only the region actually searched — the tail from the starting
//! line for [`find_next`], the prefix up to the limit for [`find_prev`] —
//! and translate the engine's byte offsets back to char offsets through
//! the rope's summary-guided converters. [`find_all`] with a regex is the
//! one call that walks the full content into a buffer.

use std::collections::VecDeque;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::rope::Rope;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search. Literal searches use
    /// simple one-to-one case folding; regex searches use the engine's
    /// Unicode folding.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match expressed as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Checks the scalars adjacent to `m` through the rope's positional
/// accessors; never touches more than two chars.
fn is_whole_word(rope: &Rope, m: SearchMatch) -> bool {
    if m.is_empty() {
        return false;
    }
    let before = if m.start == 0 {
        None
    } else {
        rope.char_at(m.start - 1).ok()
    };
    let after = rope.char_at(m.end).ok();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Simple one-to-one case folding for literal comparisons.
fn fold(ch: char, case_sensitive: bool) -> char {
    if case_sensitive {
        ch
    } else {
        ch.to_lowercase().next().unwrap_or(ch)
    }
}

/// Finds the next literal occurrence of `query` (already folded) at or
/// after `from`, streaming the rope's char iterator with a sliding window.
fn next_literal_match(
    rope: &Rope,
    query: &[char],
    case_sensitive: bool,
    from: usize,
) -> Option<SearchMatch> {
    let width = query.len();
    if width == 0 || from + width > rope.len_chars() {
        return None;
    }
    let mut it = rope.chars();
    if from > 0 && !it.seek(from) {
        return None;
    }
    let mut window: VecDeque<char> = VecDeque::with_capacity(width);
    while it.next() {
        let ch = match it.current() {
            Ok(ch) => ch,
            Err(_) => return None,
        };
        if window.len() == width {
            window.pop_front();
        }
        window.push_back(fold(ch, case_sensitive));
        if window.len() == width
            && window.back() == query.last()
            && window.iter().eq(query.iter())
        {
            let end = it.position() + 1;
            return Some(SearchMatch {
                start: end - width,
                end,
            });
        }
    }
    None
}

fn folded_query(query: &str, options: SearchOptions) -> Vec<char> {
    query
        .chars()
        .map(|ch| fold(ch, options.case_sensitive))
        .collect()
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex> {
    RegexBuilder::new(query)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
        .map_err(|err| Error::InvalidInput {
            parameter: "query",
            reason: "invalid regex pattern",
            value: err.to_string(),
        })
}

/// Find the next occurrence of `query`, searching forward from `from_char`.
///
/// - Returns `Ok(None)` if no match is found (or if `query` is empty).
/// - Match ranges are character offsets and are half-open (`[start, end)`).
pub fn find_next(
    rope: &Rope,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>> {
    if query.is_empty() {
        return Ok(None);
    }
    if options.regex {
        return regex_find_next(rope, query, options, from_char);
    }

    let query = folded_query(query, options);
    let mut from = from_char;
    while let Some(m) = next_literal_match(rope, &query, options.case_sensitive, from) {
        if options.whole_word && !is_whole_word(rope, m) {
            from = m.end;
            continue;
        }
        return Ok(Some(m));
    }
    Ok(None)
}

fn regex_find_next(
    rope: &Rope,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>> {
    let len = rope.len_chars();
    let from = from_char.min(len);
    let re = compile_search_regex(query, options)?;

    // Materialize from the start of `from`'s line so `^` keeps matching
    // real line starts; matches before `from` are excluded by the search
    // offset below.
    let tail_start = rope.line_to_char(rope.char_to_line(from)?)?;
    let base_byte = rope.char_to_byte(tail_start)?;
    let tail = rope.slice(tail_start, len)?;
    let mut rel = rope.char_to_byte(from)? - base_byte;

    while let Some(m) = re.find_at(&tail, rel) {
        let start = rope.byte_to_char(base_byte + m.start())?;
        let end = rope.byte_to_char(base_byte + m.end())?;
        let candidate = SearchMatch { start, end };

        if candidate.is_empty() {
            match tail[m.end()..].chars().next() {
                Some(next) => rel = m.end() + next.len_utf8(),
                None => return Ok(None),
            }
            continue;
        }
        if options.whole_word && !is_whole_word(rope, candidate) {
            rel = m.end();
            continue;
        }
        return Ok(Some(candidate));
    }
    Ok(None)
}

/// Find the previous occurrence of `query`, searching backward from
/// `from_char`. Only matches ending at or before `from_char` count.
pub fn find_prev(
    rope: &Rope,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>> {
    if query.is_empty() {
        return Ok(None);
    }
    let limit = from_char.min(rope.len_chars());

    if options.regex {
        let re = compile_search_regex(query, options)?;
        // Only the prefix up to the limit is materialized; its byte
        // offsets coincide with the rope's.
        let prefix = rope.slice(0, limit)?;
        let mut last = None;
        for m in re.find_iter(&prefix) {
            let candidate = SearchMatch {
                start: rope.byte_to_char(m.start())?,
                end: rope.byte_to_char(m.end())?,
            };
            if candidate.is_empty() {
                continue;
            }
            if options.whole_word && !is_whole_word(rope, candidate) {
                continue;
            }
            last = Some(candidate);
        }
        return Ok(last);
    }

    let query = folded_query(query, options);
    let mut last = None;
    let mut from = 0;
    while let Some(m) = next_literal_match(rope, &query, options.case_sensitive, from) {
        if m.end > limit {
            break;
        }
        from = m.end;
        if options.whole_word && !is_whole_word(rope, m) {
            continue;
        }
        last = Some(m);
    }
    Ok(last)
}

/// Find all (non-overlapping) occurrences of `query` in the rope.
pub fn find_all(rope: &Rope, query: &str, options: SearchOptions) -> Result<Vec<SearchMatch>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    if options.regex {
        let re = compile_search_regex(query, options)?;
        // Regex needs the whole document contiguous; this is the one call
        // that pays for a full copy.
        let haystack = rope.text();
        for m in re.find_iter(&haystack) {
            let candidate = SearchMatch {
                start: rope.byte_to_char(m.start())?,
                end: rope.byte_to_char(m.end())?,
            };
            if candidate.is_empty() {
                continue;
            }
            if options.whole_word && !is_whole_word(rope, candidate) {
                continue;
            }
            matches.push(candidate);
        }
        return Ok(matches);
    }

    let query = folded_query(query, options);
    let mut from = 0;
    while let Some(m) = next_literal_match(rope, &query, options.case_sensitive, from) {
        from = m.end;
        if options.whole_word && !is_whole_word(rope, m) {
            continue;
        }
        matches.push(m);
    }
    Ok(matches)
}

/// Returns `true` if the rope contains `query` (literal match, default
/// options).
pub fn contains(rope: &Rope, query: &str) -> bool {
    matches!(
        find_next(rope, query, SearchOptions::default(), 0),
        Ok(Some(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_next_literal() {
        let rope = Rope::from_text("hello world, hello rope");
        let m = find_next(&rope, "hello", SearchOptions::default(), 0)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (0, 5));
        let m = find_next(&rope, "hello", SearchOptions::default(), 1)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (13, 18));
        assert!(find_next(&rope, "absent", SearchOptions::default(), 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_literal_match_across_chunk_boundary() {
        // Two leaves that split the needle in half; the char stream must
        // still see it whole.
        let rope = Rope::from_text("prefix nee").concat(&Rope::from_text("dle suffix"));
        assert_eq!(rope.leaf_count(), 2);

        let m = find_next(&rope, "needle", SearchOptions::default(), 0)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (7, 13));
        assert_eq!(rope.slice(m.start, m.end).unwrap(), "needle");
    }

    #[test]
    fn test_find_prev() {
        let rope = Rope::from_text("ab ab ab");
        let m = find_prev(&rope, "ab", SearchOptions::default(), 7)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (3, 5));
        // A match ending exactly at the limit counts.
        let m = find_prev(&rope, "ab", SearchOptions::default(), 5)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (3, 5));
        assert!(find_prev(&rope, "ab", SearchOptions::default(), 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_all_case_insensitive() {
        let rope = Rope::from_text("Rope rope ROPE");
        let options = SearchOptions {
            case_sensitive: false,
            ..SearchOptions::default()
        };
        assert_eq!(find_all(&rope, "rope", options).unwrap().len(), 3);
        assert_eq!(
            find_all(&rope, "rope", SearchOptions::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_find_all_is_non_overlapping() {
        let rope = Rope::from_text("aaa");
        let matches = find_all(&rope, "aa", SearchOptions::default()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].start, matches[0].end), (0, 2));
    }

    #[test]
    fn test_whole_word() {
        let rope = Rope::from_text("cat catalog cat");
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        let matches = find_all(&rope, "cat", options).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].start, 0);
        assert_eq!(matches[1].start, 12);
    }

    #[test]
    fn test_regex_search() {
        let rope = Rope::from_text("v1.2 and v3.4");
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let matches = find_all(&rope, r"v\d+\.\d+", options).unwrap();
        assert_eq!(matches.len(), 2);

        assert!(matches!(
            find_all(&rope, r"(unclosed", options),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_regex_find_next_from_offset() {
        let rope = Rope::from_text("one 11 two 22 three 33");
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let m = find_next(&rope, r"\d+", options, 6).unwrap().unwrap();
        assert_eq!((m.start, m.end), (11, 13));
    }

    #[test]
    fn test_regex_line_anchor_with_mid_line_start() {
        // Starting mid-line must not let `^` match the search offset.
        let rope = Rope::from_text("xstart\nstart here");
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let m = find_next(&rope, "^start", options, 1).unwrap().unwrap();
        assert_eq!(m.start, 7);
    }

    #[test]
    fn test_char_offsets_with_multibyte() {
        let rope = Rope::from_text("日本語 rope 日本語");
        let m = find_next(&rope, "rope", SearchOptions::default(), 0)
            .unwrap()
            .unwrap();
        assert_eq!((m.start, m.end), (4, 8));
        assert_eq!(rope.slice(m.start, m.end).unwrap(), "rope");

        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let m = find_next(&rope, "rope", options, 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (4, 8));
    }

    #[test]
    fn test_contains() {
        let rope = Rope::from_text("needle in haystack");
        assert!(contains(&rope, "needle"));
        assert!(!contains(&rope, "thread"));
    }
}
