use std::ops::Range;
use std::str::FromStr;

use crate::error::{RagError, Result};

/// Where the next window starts relative to the chunk just emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapAnchor {
    /// `overlap` chars before the end of the fixed-size window, ignoring any
    /// shortening at a sentence or line break. Text between a shortened
    /// chunk's end and the next start can be skipped.
    #[default]
    Window,
    /// `overlap` chars before the end of the emitted (possibly shortened)
    /// chunk. Every input char lands in at least one chunk.
    BreakPoint,
}

impl FromStr for OverlapAnchor {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakpoint" | "break_point" | "break-point" => Ok(OverlapAnchor::BreakPoint),
            "window" => Ok(OverlapAnchor::Window),
            other => Err(RagError::Configuration(format!(
                "unknown overlap anchor '{}' (expected breakpoint or window)",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkOptions {
    size: usize,
    overlap: usize,
    anchor: OverlapAnchor,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
            anchor: OverlapAnchor::Window,
        }
    }
}

impl ChunkOptions {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap >= size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self {
            size,
            overlap,
            anchor: OverlapAnchor::default(),
        })
    }

    pub fn with_anchor(mut self, anchor: OverlapAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn anchor(&self) -> OverlapAnchor {
        self.anchor
    }
}

/// Splits `text` into overlapping windows of at most `opts.size()` chars.
///
/// A window that does not reach the end of the text is shortened to end just
/// after its last `.` or `\n`, provided that break lies past the middle of the
/// window. Chunks are whitespace-trimmed; a window holding only whitespace
/// still yields an (empty) chunk. Blank input yields no chunks.
///
/// The cursor keeps advancing until it passes the end of the text, so the
/// last chunk may be a tail that lies wholly inside the previous one.
pub fn chunk_text(text: &str, opts: &ChunkOptions) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chunk_spans(text, opts)
        .into_iter()
        .map(|span| {
            let chunk_str: String = chars[span].iter().collect();
            chunk_str.trim().to_string()
        })
        .collect()
}

/// The untrimmed char ranges `chunk_text` cuts `text` into.
pub fn chunk_spans(text: &str, opts: &ChunkOptions) -> Vec<Range<usize>> {
    if text.trim().is_empty() {
        return vec![];
    }

    let size = opts.size;
    let overlap = opts.overlap;
    let chars: Vec<char> = text.chars().collect();
    let len_chars = chars.len();

    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < len_chars {
        let window_end = start + size;
        let mut end = window_end.min(len_chars);

        if window_end < len_chars {
            let window = &chars[start..window_end];
            if let Some(break_point) = window.iter().rposition(|&c| c == '.' || c == '\n') {
                if break_point * 2 > size {
                    end = start + break_point + 1;
                }
            }
        }

        spans.push(start..end);

        start = match opts.anchor {
            OverlapAnchor::Window => window_end - overlap,
            OverlapAnchor::BreakPoint => {
                let next = end.saturating_sub(overlap);
                // A break just past the midpoint with a large overlap could
                // stall the cursor.
                if next > start {
                    next
                } else {
                    window_end - overlap
                }
            }
        };
    }

    spans
}
