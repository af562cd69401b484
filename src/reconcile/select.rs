//! Chunk selection and merging.
//!
//! Given the chunks between a target and a formatter's candidate, keep the
//! candidate's version of every chunk that touches an edited line and the
//! target's version of everything else.

use crate::model::{Chunk, ChunkTag, LineSet, TextDocument};
use crate::reconcile::chunks::diff_chunks;

/// The result of one merge: the merged document and the chunks whose
/// candidate side was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Merge {
    pub document: TextDocument,
    pub applied: Vec<Chunk>,
}

/// Merge `candidate` into `target` over precomputed `chunks`.
///
/// `chunks` must come from [`diff_chunks`] over the same two documents.
/// The merged document always carries the target's newline style, trailing
/// newline and encoding.
#[must_use]
pub fn merge_chunks(
    target: &TextDocument,
    candidate: &TextDocument,
    chunks: &[Chunk],
    edited: &LineSet,
) -> Merge {
    if target.is_empty() {
        // Nothing to merge into: the candidate is the whole file or nothing.
        return if edited.is_empty() {
            Merge {
                document: target.clone(),
                applied: Vec::new(),
            }
        } else {
            Merge {
                document: candidate.clone(),
                applied: chunks.to_vec(),
            }
        };
    }

    let mut lines: Vec<&str> = Vec::with_capacity(target.line_count());
    let mut applied = Vec::new();
    for chunk in chunks {
        let take_candidate = chunk.tag != ChunkTag::Equal && chunk.touches(edited);
        if take_candidate {
            lines.extend(
                candidate.lines()[chunk.candidate.clone()]
                    .iter()
                    .map(String::as_str),
            );
            applied.push(chunk.clone());
        } else {
            lines.extend(
                target.lines()[chunk.target.clone()]
                    .iter()
                    .map(String::as_str),
            );
        }
    }

    let document = TextDocument::from_lines(
        lines,
        target.newline(),
        target.has_trailing_newline(),
        target.encoding(),
    );
    Merge { document, applied }
}

/// Merge `candidate` into `target`, keeping candidate chunks that touch
/// `edited`.
#[must_use]
pub fn reconcile(target: &TextDocument, candidate: &TextDocument, edited: &LineSet) -> TextDocument {
    let chunks = diff_chunks(target, candidate);
    merge_chunks(target, candidate, &chunks, edited).document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Encoding, Newline};

    fn doc(text: &str) -> TextDocument {
        TextDocument::from_text(text).unwrap()
    }

    const TARGET: &str = "if True: print('hi')\nif False: print('there')\n";
    const CANDIDATE: &str = "if True:\n    print(\"hi\")\nif False: print('there')\n";

    #[test]
    fn edited_first_line_takes_candidate() {
        let merged = reconcile(&doc(TARGET), &doc(CANDIDATE), &LineSet::from([1]));
        assert_eq!(merged.text(), CANDIDATE);
    }

    #[test]
    fn nothing_edited_keeps_target() {
        let merged = reconcile(&doc(TARGET), &doc(CANDIDATE), &LineSet::new());
        assert_eq!(merged.text(), TARGET);
    }

    #[test]
    fn unrelated_edit_keeps_target() {
        let merged = reconcile(&doc(TARGET), &doc(CANDIDATE), &LineSet::from([2]));
        assert_eq!(merged.text(), TARGET);
    }

    #[test]
    fn trailing_newline_follows_target() {
        let target = doc("a = 1\nb = 2");
        let candidate = doc("a = 1\nb  =  2\n");
        let merged = reconcile(&target, &candidate, &LineSet::all(2));
        assert_eq!(merged.text(), "a = 1\nb  =  2");
        assert!(!merged.has_trailing_newline());
    }

    #[test]
    fn newline_style_follows_target() {
        let target = doc("x=1\r\ny=2\r\n");
        let candidate = doc("x = 1\ny = 2\n");
        let merged = reconcile(&target, &candidate, &LineSet::from([1]));
        assert_eq!(merged.newline(), Newline::CrLf);
        assert_eq!(merged.text(), "x = 1\r\ny=2\r\n");
    }

    #[test]
    fn encoding_follows_target() {
        let target = TextDocument::from_lines(["x=1"], Newline::Lf, true, Encoding::Latin1);
        let candidate = doc("x = 1\n");
        let merged = reconcile(&target, &candidate, &LineSet::from([1]));
        assert_eq!(merged.encoding(), Encoding::Latin1);
    }

    #[test]
    fn untouched_insertion_is_dropped() {
        let target = doc("a\nb\nc\nd\n");
        let candidate = doc("a\nb\nc\n\nd\n");
        assert_eq!(reconcile(&target, &candidate, &LineSet::from([1])).text(), "a\nb\nc\nd\n");
    }

    #[test]
    fn insertion_next_to_edit_is_applied() {
        let target = doc("a\nb\nc\nd\n");
        let candidate = doc("a\nb\nc\n\nd\n");
        // The insertion sits between lines 3 and 4; either neighbour counts.
        for line in [3, 4] {
            let merged = reconcile(&target, &candidate, &LineSet::from([line]));
            assert_eq!(merged.text(), "a\nb\nc\n\nd\n", "edited line {line}");
        }
        let merged = reconcile(&target, &candidate, &LineSet::from([2]));
        assert_eq!(merged.text(), "a\nb\nc\nd\n");
    }

    #[test]
    fn untouched_deletion_is_discarded() {
        let target = doc("a\n\n\nb\nc\n");
        let candidate = doc("a\n\nb\nc\n");
        assert_eq!(reconcile(&target, &candidate, &LineSet::from([5])).text(), "a\n\n\nb\nc\n");
        assert_eq!(reconcile(&target, &candidate, &LineSet::from([2, 3])).text(), "a\n\nb\nc\n");
    }

    #[test]
    fn replace_chunk_overlap_is_inclusive_at_edges() {
        let target = doc("a\nb1\nb2\nb3\nc\n");
        let candidate = doc("a\nB\nc\n");
        for line in [2, 4] {
            let merged = reconcile(&target, &candidate, &LineSet::from([line]));
            assert_eq!(merged.text(), "a\nB\nc\n", "edited line {line}");
        }
        for line in [1, 5] {
            let merged = reconcile(&target, &candidate, &LineSet::from([line]));
            assert_eq!(merged.text(), "a\nb1\nb2\nb3\nc\n", "edited line {line}");
        }
    }

    #[test]
    fn empty_target_with_edits_yields_candidate() {
        let candidate = doc("x = 1\n");
        let merge = merge_chunks(
            &TextDocument::empty(),
            &candidate,
            &diff_chunks(&TextDocument::empty(), &candidate),
            &LineSet::from([1]),
        );
        assert_eq!(merge.document, candidate);
    }

    #[test]
    fn empty_target_without_edits_stays_empty() {
        let candidate = doc("x = 1\n");
        let merged = reconcile(&TextDocument::empty(), &candidate, &LineSet::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn applied_lists_only_taken_chunks() {
        let target = doc("if True:\n  x = 1\n\n  y = 2\n");
        let candidate = doc("if True:\n    x = 1\n\n    y = 2\n");
        let chunks = diff_chunks(&target, &candidate);
        let merge = merge_chunks(&target, &candidate, &chunks, &LineSet::from([2]));
        assert_eq!(merge.applied.len(), 1);
        assert_eq!(merge.applied[0].target_lines(), 2..=2);
        assert_eq!(merge.document.text(), "if True:\n    x = 1\n\n  y = 2\n");
    }
}
