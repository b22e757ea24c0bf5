//! Repository transactions.

use super::change::{Change, ChangeSet};
use super::state::RepositoryState;
use crate::error::{CoreError, CoreResult};
use confsync_protocol::{ApplyState, Content, Path, Target};

/// A pending operation.
#[derive(Debug, Clone)]
enum Operation {
    Delete(Path),
    Insert {
        path: Path,
        target: Target,
        content: Content,
    },
    Update {
        path: Path,
        target: Target,
        content: Content,
    },
    SetTargetsVersion(u64),
    SetOpaqueBackendState(Option<String>),
    SetApplyState {
        path: Path,
        state: ApplyState,
    },
}

/// Operations recorded against a snapshot, applied together on commit.
///
/// Nothing is visible to readers until the repository commits the
/// transaction. Dropping it discards every operation.
#[derive(Debug, Default)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the removal of a path. Removing a path that is not applied is a no-op.
    pub fn delete(&mut self, path: Path) {
        self.operations.push(Operation::Delete(path));
    }

    /// Records a first-time application of a path.
    pub fn insert(&mut self, path: Path, target: Target, content: Content) {
        self.operations.push(Operation::Insert {
            path,
            target,
            content,
        });
    }

    /// Records the replacement of an applied path.
    pub fn update(&mut self, path: Path, target: Target, content: Content) {
        self.operations.push(Operation::Update {
            path,
            target,
            content,
        });
    }

    /// Records the targets manifest version.
    pub fn set_targets_version(&mut self, version: u64) {
        self.operations.push(Operation::SetTargetsVersion(version));
    }

    /// Records the opaque backend state.
    pub fn set_opaque_backend_state(&mut self, state: Option<String>) {
        self.operations.push(Operation::SetOpaqueBackendState(state));
    }

    /// Records the application status of an applied path.
    pub fn set_apply_state(&mut self, path: Path, state: ApplyState) {
        self.operations.push(Operation::SetApplyState { path, state });
    }

    /// Returns the number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Applies the operations to a copy of `base`.
    ///
    /// `base` is left untouched whether or not this succeeds.
    pub(crate) fn apply(self, base: &RepositoryState) -> CoreResult<(RepositoryState, ChangeSet)> {
        let mut next = base.clone();
        let mut changes = ChangeSet::new();

        for operation in self.operations {
            match operation {
                Operation::Delete(path) => {
                    if let Some(previous) = next.contents.remove(&path) {
                        next.targets.remove(&path);
                        changes.push(Change::Deleted { path, previous });
                    }
                }
                Operation::Insert {
                    path,
                    target,
                    content,
                } => {
                    if next.contents.contains(&path) {
                        return Err(CoreError::AlreadyApplied {
                            path: path.to_string(),
                        });
                    }
                    let content = applied(content, &target);
                    next.contents.push(content.clone());
                    next.targets.insert(path.clone(), target);
                    changes.push(Change::Inserted { path, content });
                }
                Operation::Update {
                    path,
                    target,
                    content,
                } => {
                    let content = applied(content, &target);
                    let previous = next.contents.upsert(content.clone()).ok_or_else(|| {
                        CoreError::NotApplied {
                            path: path.to_string(),
                        }
                    })?;
                    next.targets.insert(path.clone(), target);
                    changes.push(Change::Updated {
                        path,
                        content,
                        previous,
                    });
                }
                Operation::SetTargetsVersion(version) => next.targets_version = version,
                Operation::SetOpaqueBackendState(state) => next.opaque_backend_state = state,
                Operation::SetApplyState { path, state } => {
                    let content =
                        next.contents
                            .get_mut(&path)
                            .ok_or_else(|| CoreError::NotApplied {
                                path: path.to_string(),
                            })?;
                    content.set_apply_state(state);
                }
            }
        }

        Ok((next, changes))
    }
}

/// Stamps a content with the target version and a fresh application status.
fn applied(content: Content, target: &Target) -> Content {
    let mut content = content.with_version(target.version());
    content.set_apply_state(ApplyState::Unacknowledged);
    content
}
