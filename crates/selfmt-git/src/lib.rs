//! Read-only git access for selfmt.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which selfmt reads committed file contents. No other selfmt code imports
//! gix directly; it depends on `selfmt-git` and programs against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`],
//!   [`TreeEntry`], [`CommitInfo`], ...).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod error;
pub mod repo;
pub mod types;

// gix-backed implementation modules
mod gix_repo;
mod objects_impl;
mod refs_impl;

pub use gix_repo::{GixRepo, SyncGixRepo};

pub use error::GitError;
pub use repo::GitRepo;
pub use types::{CommitInfo, EntryMode, GitOid, OidParseError, TreeEntry};
