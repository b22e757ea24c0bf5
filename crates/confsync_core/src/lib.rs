//! # confsync Core
//!
//! Applied configuration state and the synchronization primitive that
//! drives the polling loop.
//!
//! This crate provides:
//! - `Repository`: copy-on-write snapshots of applied configurations
//! - `Transaction`: atomic compute-and-commit unit over a snapshot
//! - `ChangeSet`: the inserts, updates and deletes produced by a commit
//! - `Gate`: resettable wait/release primitive with timeouts
//!
//! ## Key Invariants
//!
//! - A path appears at most once in a snapshot
//! - A commit either fully applies or leaves the live snapshot untouched
//! - Readers holding a snapshot never observe a later commit

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod gate;
mod repository;

pub use error::{CoreError, CoreResult};
pub use gate::{Gate, Release};
pub use repository::{
    Change, ChangeKind, ChangeSet, Repository, RepositoryState, Transaction,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
