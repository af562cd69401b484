//! Line diff of a target document against a formatter's candidate.

use std::ops::Range;

use similar::{Algorithm, DiffTag, capture_diff_slices};

use crate::model::{Chunk, ChunkTag, TextDocument};

/// Diff two line slices into opcodes.
///
/// This is the one diff used by both the edit calculator and the chunk
/// matcher, so ties between equally long matches break the same way in
/// both.
pub(crate) fn line_opcodes(
    old: &[String],
    new: &[String],
) -> Vec<(ChunkTag, Range<usize>, Range<usize>)> {
    capture_diff_slices(Algorithm::Myers, old, new)
        .iter()
        .map(|op| {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            let tag = match tag {
                DiffTag::Equal => ChunkTag::Equal,
                DiffTag::Replace => ChunkTag::Replace,
                DiffTag::Insert => ChunkTag::Insert,
                DiffTag::Delete => ChunkTag::Delete,
            };
            (tag, old_range, new_range)
        })
        .collect()
}

/// Diff `target` against `candidate` into an ordered list of chunks.
///
/// Each opcode of the underlying diff becomes exactly one chunk; adjacent
/// non-equal opcodes are not merged. The chunks tile both documents: their
/// target ranges cover `0..target.line_count()` in order, and likewise for
/// the candidate.
#[must_use]
pub fn diff_chunks(target: &TextDocument, candidate: &TextDocument) -> Vec<Chunk> {
    line_opcodes(target.lines(), candidate.lines())
        .into_iter()
        .map(|(tag, target, candidate)| Chunk {
            tag,
            target,
            candidate,
        })
        .collect()
}
