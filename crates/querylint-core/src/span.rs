//! Byte spans and line/column translation for findings

use serde::Serialize;

/// Half-open byte range into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A resolved source position (1-based line, 1-based column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Precomputed newline offsets for offset-to-location translation.
///
/// Columns are byte columns, which matches how the upstream parser reports
/// offsets; multi-byte characters before the position shift the column.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Translate a byte offset into a location. Offsets past the end of the
    /// text clamp to the last line.
    pub fn location(&self, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        Location {
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_first_line() {
        let index = LineIndex::new("abc\ndef\n");
        assert_eq!(index.location(0), Location { line: 1, column: 1 });
        assert_eq!(index.location(2), Location { line: 1, column: 3 });
    }

    #[test]
    fn test_location_later_lines() {
        let index = LineIndex::new("abc\ndef\nghi");
        assert_eq!(index.location(4), Location { line: 2, column: 1 });
        assert_eq!(index.location(9), Location { line: 3, column: 2 });
    }

    #[test]
    fn test_location_at_newline_boundary() {
        let index = LineIndex::new("a\nb");
        assert_eq!(index.location(1), Location { line: 1, column: 2 });
        assert_eq!(index.location(2), Location { line: 2, column: 1 });
    }
}
