//! Recursive document splitting into bounded, overlapping segments.
//!
//! Each segment is at most `max_chars` characters. The split point inside a
//! window prefers, in order: a paragraph break, a line break, the end of a
//! sentence, whitespace, and finally a hard cut. The next segment restarts up
//! to `overlap_chars` before the previous end, aligned to a word when possible.

use ragdemo_common::{RagError, Result, TextSegment};
use tracing::debug;

use crate::document::Document;

/// Character range of one segment within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    max_chars: usize,
    overlap_chars: usize,
}

impl DocumentSplitter {
    pub fn recursive(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(RagError::Config("max segment size must be positive".into()));
        }
        if overlap_chars >= max_chars {
            return Err(RagError::Config(format!(
                "overlap ({overlap_chars}) must be smaller than max segment size ({max_chars})"
            )));
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Splits a document, tagging each segment with its `index` and the
    /// document's metadata.
    pub fn split(&self, document: &Document) -> Vec<TextSegment> {
        let chars: Vec<char> = document.text.chars().collect();
        let segments: Vec<TextSegment> = self
            .split_spans(&chars)
            .into_iter()
            .enumerate()
            .map(|(index, span)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("index".into(), index.to_string());
                let text: String = chars[span.start..span.end].iter().collect();
                TextSegment::with_metadata(text, metadata)
            })
            .collect();
        debug!(
            chars = chars.len(),
            segments = segments.len(),
            "Split document"
        );
        segments
    }

    /// Character spans of each segment, trimmed of surrounding whitespace.
    pub fn split_spans(&self, chars: &[char]) -> Vec<Span> {
        let n = chars.len();
        let mut spans = Vec::new();
        let mut start = skip_whitespace(chars, 0);

        while start < n {
            let limit = (start + self.max_chars).min(n);
            let end = if limit == n {
                n
            } else {
                self.find_break(chars, start, limit).unwrap_or(limit)
            };

            let trimmed_end = trim_end(chars, start, end);
            if trimmed_end > start {
                spans.push(Span {
                    start,
                    end: trimmed_end,
                });
            }

            if end >= n {
                break;
            }

            let next = self.overlap_start(chars, start, end);
            start = skip_whitespace(chars, next);
        }

        spans
    }

    /// Last preferred boundary in `(start + overlap, limit]`, coarsest kind first.
    fn find_break(&self, chars: &[char], start: usize, limit: usize) -> Option<usize> {
        let floor = start + self.overlap_chars;
        let candidates = |is_break: &dyn Fn(usize) -> Option<usize>| {
            (start..limit)
                .rev()
                .filter_map(is_break)
                .find(|&end| end > floor && end <= limit)
        };

        let paragraph = |i: usize| {
            (chars[i] == '\n' && i + 1 < chars.len() && chars[i + 1] == '\n').then_some(i + 2)
        };
        let line = |i: usize| (chars[i] == '\n').then_some(i + 1);
        let sentence = |i: usize| {
            (matches!(chars[i], '.' | '!' | '?')
                && chars.get(i + 1).is_some_and(|c| c.is_whitespace()))
            .then_some(i + 1)
        };
        let word = |i: usize| chars[i].is_whitespace().then_some(i + 1);

        candidates(&paragraph)
            .or_else(|| candidates(&line))
            .or_else(|| candidates(&sentence))
            .or_else(|| candidates(&word))
    }

    /// Where the segment after `[start, end)` begins.
    fn overlap_start(&self, chars: &[char], start: usize, end: usize) -> usize {
        let candidate = end.saturating_sub(self.overlap_chars).max(start + 1);
        // Do not begin mid-word if a word boundary lies inside the overlap.
        if candidate > 0 && !chars[candidate - 1].is_whitespace() {
            if let Some(offset) = chars[candidate..end].iter().position(|c| c.is_whitespace()) {
                return candidate + offset + 1;
            }
        }
        candidate
    }
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn trim_end(chars: &[char], start: usize, mut end: usize) -> usize {
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    end
}
