//! Coordinate and strand types for annotated features.

use serde::Serialize;
use std::fmt;

/// The coordinate pair of a feature as exported by the curation tool.
///
/// GFF coordinates are 1-based and closed; `begin <= end` is assumed but not
/// enforced, since reversed pairs are exactly what the audit should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub begin: u64,
    pub end: u64,
}

impl Span {
    /// Create a new span.
    #[inline]
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Check whether both bounds of `inner` lie within `self`.
    #[inline]
    pub fn contains(&self, inner: &Span) -> bool {
        self.holds(inner.begin) && self.holds(inner.end)
    }

    #[inline]
    fn holds(&self, pos: u64) -> bool {
        self.begin <= pos && pos <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Begin:{}..End:{}", self.begin, self.end)
    }
}

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strand {
    Plus,
    Minus,
    Unstranded,
    Unknown,
}

impl Strand {
    fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Plus,
            '-' => Strand::Minus,
            '.' => Strand::Unstranded,
            _ => Strand::Unknown,
        }
    }

    /// Parse a strand column.
    pub fn parse(s: &str) -> Self {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Strand::Unknown,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
            Strand::Unstranded => write!(f, "."),
            Strand::Unknown => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_containment() {
        let gene = Span::new(100, 500);

        assert!(gene.contains(&Span::new(100, 500)));
        assert!(gene.contains(&Span::new(150, 300)));
        assert!(!gene.contains(&Span::new(99, 300))); // Begin outside
        assert!(!gene.contains(&Span::new(150, 501))); // End outside
        assert!(!gene.contains(&Span::new(600, 700)));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(36675298, 36675597).to_string(), "Begin:36675298..End:36675597");
    }

    #[test]
    fn test_span_contains_at_coordinate_limit() {
        let whole = Span::new(1, u64::MAX);
        assert!(whole.contains(&Span::new(u64::MAX, u64::MAX)));
        assert!(!Span::new(1, u64::MAX - 1).contains(&Span::new(5, u64::MAX)));
    }

    #[test]
    fn test_strand_round_trip_symbols() {
        for symbol in ["+", "-", "."] {
            assert_eq!(Strand::parse(symbol).to_string(), symbol);
        }
        assert_eq!(Strand::parse("x"), Strand::Unknown);
        assert_eq!(Strand::parse("+-"), Strand::Unknown);
    }
}
