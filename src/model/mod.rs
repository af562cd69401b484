//! Value types shared by every stage of the reconciliation engine.

pub mod chunk;
pub mod document;
pub mod lines;

pub use chunk::{Chunk, ChunkTag};
pub use document::{DecodeError, Encoding, Newline, TextDocument};
pub use lines::LineSet;
