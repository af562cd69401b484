//! Which lines of the target were edited relative to the base.

use std::ops::Range;

use crate::model::{ChunkTag, LineSet, TextDocument};
use crate::reconcile::chunks::line_opcodes;

/// The base→target diff of one file, kept so the edited-line set can be
/// recomputed cheaply for several context widths.
#[derive(Clone, Debug)]
pub struct EditedLinesDiffer {
    /// Target-side ranges (0-indexed, half-open) of every non-equal opcode.
    hunks: Vec<Range<usize>>,
    line_count: usize,
}

impl EditedLinesDiffer {
    /// Diff `base` against `target`.
    #[must_use]
    pub fn new(base: &TextDocument, target: &TextDocument) -> Self {
        let hunks = line_opcodes(base.lines(), target.lines())
            .into_iter()
            .filter(|(tag, _, _)| *tag != ChunkTag::Equal)
            .map(|(_, _, target_range)| target_range)
            .collect();
        Self {
            hunks,
            line_count: target.line_count(),
        }
    }

    /// Number of non-equal opcodes between base and target.
    #[must_use]
    pub fn hunk_count(&self) -> usize {
        self.hunks.len()
    }

    /// Whether base and target have identical lines.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Target lines inside any hunk, widened by `context` lines on each side
    /// and clipped to the document.
    ///
    /// A pure deletion has no target lines, so it marks nothing at width 0
    /// and its neighbours at larger widths.
    #[must_use]
    pub fn edited_lines(&self, context: usize) -> LineSet {
        self.hunks
            .iter()
            .flat_map(|hunk| {
                let start = (hunk.start + 1).saturating_sub(context).max(1);
                let end = hunk.end.saturating_add(context).min(self.line_count);
                start..=end
            })
            .collect()
    }
}

/// Compute the edited lines of `target` relative to `base` in one call.
#[must_use]
pub fn compute_edited(base: &TextDocument, target: &TextDocument, context: usize) -> LineSet {
    EditedLinesDiffer::new(base, target).edited_lines(context)
}
