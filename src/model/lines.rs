//! Sets of edited line numbers.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

/// A set of 1-indexed line numbers in a target document.
///
/// Produced by the edit calculator and consumed by the chunk selector.
/// Never mutated after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineSet(BTreeSet<usize>);

impl LineSet {
    /// The empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Every line of a document with `line_count` lines.
    #[must_use]
    pub fn all(line_count: usize) -> Self {
        Self((1..=line_count).collect())
    }

    /// Whether `line` is in the set.
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        self.0.contains(&line)
    }

    /// Whether any line in the inclusive range is in the set.
    #[must_use]
    pub fn intersects(&self, lines: RangeInclusive<usize>) -> bool {
        if lines.is_empty() {
            return false;
        }
        self.0.range(lines).next().is_some()
    }

    /// Whether every line of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Number of lines in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lines in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for LineSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().filter(|&line| line > 0).collect())
    }
}

impl<const N: usize> From<[usize; N]> for LineSet {
    fn from(lines: [usize; N]) -> Self {
        lines.into_iter().collect()
    }
}

impl fmt::Display for LineSet {
    /// Compact range notation, e.g. `1-3,7,9-10`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.iter().peekable();
        let mut first = true;
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        Ok(())
    }
}
