/// Byte spans into the raw configuration string
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A byte range inside the configuration string an entry was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The text this span covers, or `None` if it does not fall on char boundaries of `source`
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.range())
    }

    /// Convert to a char-offset range, which is what ariadne labels index by
    pub fn char_range(&self, source: &str) -> Range<usize> {
        let to_chars = |byte: usize| {
            let byte = byte.min(source.len());
            source
                .char_indices()
                .take_while(|(index, _)| *index < byte)
                .count()
        };
        to_chars(self.start)..to_chars(self.end)
    }
}

/// A value with the span it was parsed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Spanned { value, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_returns_covered_text() {
        let source = "Medium; Low";
        assert_eq!(Span::new(8, 11).slice(source), Some("Low"));
        assert_eq!(Span::new(8, 40).slice(source), None);
    }

    #[test]
    fn test_char_range_counts_multibyte_chars_once() {
        // "Ü" is two bytes, so "Hoch" starts at byte 10 but char 9
        let source = "Übrig ;  Hoch";
        let span = Span::new(10, 14);
        assert_eq!(span.slice(source), Some("Hoch"));
        assert_eq!(span.char_range(source), 9..13);
    }
}
