//! Adaptive search for the narrowest safe context width.
//!
//! Merging only the chunks that touch edited lines can break code: a block
//! reformatted on one line but not the next no longer parses, or parses
//! into a different tree. Widening the context around each edit pulls in
//! more of the formatter's output until the merge verifies. The search
//! tries width 0, doubles until a width verifies, then bisects back down
//! to the smallest verifying width.

use tracing::{debug, instrument};

use crate::error::ReconcileError;
use crate::model::{Chunk, TextDocument};
use crate::reconcile::chunks::diff_chunks;
use crate::reconcile::edits::EditedLinesDiffer;
use crate::reconcile::select::merge_chunks;
use crate::reconcile::verify::{AstVerifier, Equivalence, Side};

/// One merge tried by the search.
#[derive(Clone, Debug)]
pub struct ReconcileAttempt {
    pub context: usize,
    pub merged: TextDocument,
    pub applied: Vec<Chunk>,
    pub outcome: Equivalence,
}

/// How a search ended.
#[derive(Clone, Debug)]
pub enum SearchOutcome {
    /// `document` is equivalent to the target and `context` is the smallest
    /// width found to produce an equivalent merge.
    Found {
        context: usize,
        document: TextDocument,
        attempts: usize,
    },
    /// Not even the widest context produced an equivalent merge.
    Exhausted { attempts: usize },
}

impl SearchOutcome {
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Found { attempts, .. } | Self::Exhausted { attempts } => *attempts,
        }
    }
}

/// A successful reconciliation of one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub context: usize,
    pub document: TextDocument,
    pub attempts: usize,
}

/// Search state for one file. Diffs are computed once up front; each
/// attempt only re-expands the edited lines and re-merges.
pub struct ContextSearch<'a> {
    target: &'a TextDocument,
    candidate: &'a TextDocument,
    edits: EditedLinesDiffer,
    chunks: Vec<Chunk>,
    verifier: Option<AstVerifier>,
    attempts: usize,
}

impl<'a> ContextSearch<'a> {
    #[must_use]
    pub fn new(base: &TextDocument, target: &'a TextDocument, candidate: &'a TextDocument) -> Self {
        Self {
            target,
            candidate,
            edits: EditedLinesDiffer::new(base, target),
            chunks: diff_chunks(target, candidate),
            verifier: None,
            attempts: 0,
        }
    }

    /// The widest context ever tried: the target's line count.
    #[must_use]
    pub fn max_context(&self) -> usize {
        self.target.line_count()
    }

    /// Merge and verify at one context width.
    ///
    /// # Errors
    /// [`ReconcileError::OriginalUnparseable`] if the target has syntax
    /// errors and the merge differs from it.
    pub fn attempt(&mut self, context: usize) -> Result<ReconcileAttempt, ReconcileError> {
        self.attempts += 1;
        let edited = self.edits.edited_lines(context);
        let merge = merge_chunks(self.target, self.candidate, &self.chunks, &edited);

        let outcome = if merge.document.same_lines(self.target) {
            Equivalence::Equivalent
        } else {
            let mut verifier = match self.verifier.take() {
                Some(verifier) => verifier,
                None => AstVerifier::new(self.target)?,
            };
            let outcome = verifier.verify(&merge.document);
            self.verifier = Some(verifier);
            outcome
        };
        debug!(
            context,
            edited = edited.len(),
            applied = merge.applied.len(),
            %outcome,
            "context attempt"
        );
        if outcome == Equivalence::ParseFailure(Side::Original) {
            return Err(ReconcileError::OriginalUnparseable);
        }

        Ok(ReconcileAttempt {
            context,
            merged: merge.document,
            applied: merge.applied,
            outcome,
        })
    }

    /// Run the search to completion.
    ///
    /// # Errors
    /// [`ReconcileError::OriginalUnparseable`] if the target has syntax
    /// errors, or a parser setup failure.
    #[instrument(level = "debug", skip(self), fields(lines = self.target.line_count()))]
    pub fn run(mut self) -> Result<SearchOutcome, ReconcileError> {
        if self.edits.edited_lines(0).is_empty() {
            self.attempts += 1;
            return Ok(self.found(0, self.target.clone()));
        }
        let first = self.attempt(0)?;
        if first.outcome.is_equivalent() {
            return Ok(self.found(0, first.merged));
        }

        // Double until some width verifies. `failing` is always a width
        // known not to verify.
        let max = self.max_context();
        let mut failing = 0;
        let mut width = 1;
        let mut succeeded = None;
        while width <= max {
            let attempt = self.attempt(width)?;
            if attempt.outcome.is_equivalent() {
                succeeded = Some(attempt);
                break;
            }
            failing = width;
            if width == max {
                break;
            }
            width = (width * 2).min(max);
        }
        let Some(mut best) = succeeded else {
            debug!(attempts = self.attempts, "no safe context width");
            return Ok(SearchOutcome::Exhausted {
                attempts: self.attempts,
            });
        };

        // Bisect (failing, best.context] for the smallest verifying width.
        while best.context - failing > 1 {
            let mid = failing + (best.context - failing) / 2;
            let attempt = self.attempt(mid)?;
            if attempt.outcome.is_equivalent() {
                best = attempt;
            } else {
                failing = mid;
            }
        }
        Ok(self.found(best.context, best.merged))
    }

    fn found(&self, context: usize, document: TextDocument) -> SearchOutcome {
        debug!(context, attempts = self.attempts, "safe context width found");
        SearchOutcome::Found {
            context,
            document,
            attempts: self.attempts,
        }
    }
}

/// Find the smallest context width whose merge of `candidate` into `target`
/// is equivalent to `target`.
///
/// # Errors
/// [`ReconcileError::Exhausted`] when no width works, or
/// [`ReconcileError::OriginalUnparseable`] when `target` has syntax errors.
pub fn find_safe_reconciliation(
    base: &TextDocument,
    target: &TextDocument,
    candidate: &TextDocument,
) -> Result<Reconciliation, ReconcileError> {
    let search = ContextSearch::new(base, target, candidate);
    let max_context = search.max_context();
    match search.run()? {
        SearchOutcome::Found {
            context,
            document,
            attempts,
        } => Ok(Reconciliation {
            context,
            document,
            attempts,
        }),
        SearchOutcome::Exhausted { attempts } => Err(ReconcileError::Exhausted {
            attempts,
            max_context,
        }),
    }
}
