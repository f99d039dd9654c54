//! Inclusive line-number intervals.
//!
//! A [`LineRange`] covers `start..=end`. A range built from a line count of
//! zero is a *zero-width anchor*: it still knows where it sits (so it can be
//! printed in a hunk header as `start,0`) but contains no line.
//!
//! ```
//! use git_stage_lines::LineRange;
//!
//! let range = LineRange::from_start_with_lines(10, 3);
//! assert_eq!((range.start(), range.end(), range.lines()), (10, 12, 3));
//! assert_eq!(range.to_string(), "10,3");
//!
//! let anchor = LineRange::from_start_with_lines(7, 0);
//! assert_eq!(anchor.to_string(), "7,0");
//! assert!(!anchor.contains(7));
//! ```

use std::cmp::{max, min};
use std::fmt;
use std::ops::RangeInclusive;

/// An inclusive interval of 1-based line numbers.
///
/// `start <= end` always holds: every constructor and setter swaps the two
/// bounds when they arrive inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    start: i64,
    end: i64,
    includes_start_line: bool,
}

impl LineRange {
    /// Range covering `start..=end`, normalizing inverted bounds.
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        Self::with_start_line(start, end, true)
    }

    /// Range whose first line is optionally excluded from its extent.
    #[must_use]
    pub fn with_start_line(start: i64, end: i64, includes_start_line: bool) -> Self {
        let (start, end) = if start > end {
            (end, start)
        } else {
            (start, end)
        };
        Self {
            start,
            end,
            includes_start_line,
        }
    }

    /// Zero-width anchor positioned at `line`.
    #[must_use]
    pub fn anchor(line: i64) -> Self {
        Self::with_start_line(line, line, false)
    }

    /// Range of `lines` lines beginning at `start`.
    ///
    /// A count of zero (or less) yields a zero-width anchor at `start`.
    #[must_use]
    pub fn from_start_with_lines(start: i64, lines: i64) -> Self {
        if lines <= 0 {
            Self::anchor(start)
        } else {
            Self::new(start, start + lines - 1)
        }
    }

    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    #[must_use]
    pub fn includes_start_line(&self) -> bool {
        self.includes_start_line
    }

    pub fn set_start(&mut self, start: i64) {
        *self = Self::with_start_line(start, self.end, self.includes_start_line);
    }

    pub fn set_end(&mut self, end: i64) {
        *self = Self::with_start_line(self.start, end, self.includes_start_line);
    }

    /// Resize the range to `lines` lines, keeping its start.
    pub fn set_lines(&mut self, lines: i64) {
        *self = Self::from_start_with_lines(self.start, lines);
    }

    /// Number of lines covered.
    #[must_use]
    pub fn lines(&self) -> i64 {
        if self.includes_start_line {
            self.end - self.start + 1
        } else {
            self.end - self.start
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines() == 0
    }

    /// First line actually covered by the range.
    fn first_line(&self) -> i64 {
        if self.includes_start_line {
            self.start
        } else {
            self.start + 1
        }
    }

    #[must_use]
    pub fn contains(&self, line: i64) -> bool {
        self.first_line() <= line && line <= self.end
    }

    /// Intersection of two ranges, or `None` when they share no line.
    #[must_use]
    pub fn overlap(&self, other: &LineRange) -> Option<LineRange> {
        let start = max(self.first_line(), other.first_line());
        let end = min(self.end, other.end);
        (start <= end).then(|| LineRange::new(start, end))
    }

    /// The same range shifted by `delta` lines.
    #[must_use]
    pub fn offset(self, delta: i64) -> Self {
        Self::with_start_line(self.start + delta, self.end + delta, self.includes_start_line)
    }

    /// A copy widened by `lines` on both sides.
    #[must_use]
    pub fn inflate(self, lines: i64) -> Self {
        Self::with_start_line(self.start - lines, self.end + lines, self.includes_start_line)
    }

    /// The line numbers covered, in ascending order.
    pub fn iter(&self) -> RangeInclusive<i64> {
        self.first_line()..=self.end
    }

    /// The `start,lines` half of a unified hunk header.
    #[must_use]
    pub fn to_unified_header_string(&self) -> String {
        format!("{},{}", self.start, self.lines())
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.lines())
    }
}

impl IntoIterator for LineRange {
    type Item = i64;
    type IntoIter = RangeInclusive<i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
