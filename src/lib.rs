//! Apply a code formatter only to the lines edited between two revisions.
//!
//! The engine lives in [`reconcile`]; [`pipeline`] runs it per file with
//! documents fetched through [`snapshot`] and candidates produced by
//! [`format`].

pub mod config;
pub mod error;
pub mod files;
pub mod format;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod reconcile;
pub mod report;
pub mod snapshot;
pub mod telemetry;

pub use error::{FileError, ReconcileError, SetupError};
pub use model::{Chunk, ChunkTag, LineSet, TextDocument};
pub use pipeline::{FileOutcome, RunContext, reconcile_file};
