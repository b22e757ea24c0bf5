//! Applied configuration repository.
//!
//! The repository publishes immutable [`RepositoryState`] snapshots behind an
//! `Arc`. A transaction computes a new snapshot from the current one and the
//! repository swaps it in on success, so readers always see either the old or
//! the new snapshot in full.

mod change;
mod state;
mod transaction;

pub use change::{Change, ChangeKind, ChangeSet};
pub use state::RepositoryState;
pub use transaction::Transaction;

use crate::error::CoreError;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the applied configurations.
///
/// ## Single-Writer Guarantee
///
/// Only one transaction runs at a time; the write lock is held from the
/// moment the snapshot is taken until the new snapshot is published.
#[derive(Debug)]
pub struct Repository {
    current: RwLock<Arc<RepositoryState>>,
    write_lock: Mutex<()>,
    commits: AtomicU64,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::with_state(RepositoryState::new())
    }

    /// Creates a repository starting from an existing snapshot.
    pub fn with_state(state: RepositoryState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
            write_lock: Mutex::new(()),
            commits: AtomicU64::new(0),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<RepositoryState> {
        Arc::clone(&self.current.read())
    }

    /// Returns the number of successful commits.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Runs a transaction.
    ///
    /// `f` receives the current snapshot and a transaction to record
    /// operations into. If `f` returns `Ok`, the operations are applied to a
    /// copy of the snapshot, the copy is published, and the resulting changes
    /// are returned. If `f` or the commit fails, nothing is published.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let changes = repository.transaction(|current, txn| {
    ///     for path in current.paths() {
    ///         txn.delete(path.clone());
    ///     }
    ///     Ok::<_, CoreError>(())
    /// })?;
    /// ```
    pub fn transaction<F, E>(&self, f: F) -> Result<ChangeSet, E>
    where
        F: FnOnce(&RepositoryState, &mut Transaction) -> Result<(), E>,
        E: From<CoreError>,
    {
        let _write_guard = self.write_lock.lock();
        let current = self.state();

        let mut txn = Transaction::new();
        f(&*current, &mut txn)?;

        let (next, changes) = txn.apply(&current)?;
        *self.current.write() = Arc::new(next);
        self.commits.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            changes = changes.len(),
            applied = self.current.read().len(),
            "repository commit"
        );

        Ok(changes)
    }
}
