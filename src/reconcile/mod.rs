//! The reconciliation engine.
//!
//! For one file: find the target lines edited since the base
//! ([`edits`]), diff the target against the formatter's candidate
//! ([`chunks`]), keep the candidate's version of the chunks that touch an
//! edit ([`select`]), check the result is structurally the same program
//! ([`verify`]), and widen the context until it is ([`search`]).

pub mod chunks;
pub mod edits;
pub mod search;
pub mod select;
pub mod verify;

pub use chunks::diff_chunks;
pub use edits::{EditedLinesDiffer, compute_edited};
pub use search::{
    ContextSearch, ReconcileAttempt, Reconciliation, SearchOutcome, find_safe_reconciliation,
};
pub use select::{Merge, merge_chunks, reconcile};
pub use verify::{AstVerifier, Equivalence, ParserSetupError, Side, verify};
