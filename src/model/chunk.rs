//! Diff chunks between a target document and a formatter's candidate.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use crate::model::lines::LineSet;

/// What a chunk does to the target to turn it into the candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// Identical lines on both sides.
    Equal,
    /// Target lines replaced by different candidate lines.
    Replace,
    /// Candidate lines with no target counterpart.
    Insert,
    /// Target lines with no candidate counterpart.
    Delete,
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Replace => write!(f, "replace"),
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One contiguous span of a line diff.
///
/// Ranges are 0-indexed and half-open into the target and candidate line
/// vectors; the chunk itself never copies any text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub target: Range<usize>,
    pub candidate: Range<usize>,
}

impl Chunk {
    /// The chunk's target lines as a 1-indexed inclusive range
    /// (`targetStart..=targetEnd`). Empty for [`ChunkTag::Insert`].
    #[must_use]
    pub fn target_lines(&self) -> RangeInclusive<usize> {
        (self.target.start + 1)..=self.target.end
    }

    /// The chunk's candidate lines as a 1-indexed inclusive range.
    #[must_use]
    pub fn candidate_lines(&self) -> RangeInclusive<usize> {
        (self.candidate.start + 1)..=self.candidate.end
    }

    /// Whether the chunk overlaps the edited lines.
    ///
    /// Overlap is inclusive at both ends of the target range. An insertion
    /// has no target lines of its own, so it is tested against the target
    /// line just before and just after the insertion point.
    #[must_use]
    pub fn touches(&self, edited: &LineSet) -> bool {
        match self.tag {
            ChunkTag::Equal => false,
            ChunkTag::Insert => {
                let before = self.target.start;
                edited.contains(before) || edited.contains(before + 1)
            }
            ChunkTag::Replace | ChunkTag::Delete => edited.intersects(self.target_lines()),
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} target[{}..{}) candidate[{}..{})",
            self.tag, self.target.start, self.target.end, self.candidate.start, self.candidate.end
        )
    }
}
