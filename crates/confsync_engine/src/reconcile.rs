//! Reconciliation of an agent response against the applied state.
//!
//! The agent's path list is the full desired state. Every listed path is
//! classified on its own; the first path that cannot be honoured aborts the
//! whole transaction.

use crate::error::{SyncError, SyncResult};
use confsync_core::{RepositoryState, Transaction};
use confsync_protocol::{Content, ContentList, Path, Target, TargetMap};
use std::collections::BTreeSet;

/// What to do with one listed path.
#[derive(Debug)]
enum Decision<'a> {
    /// Applied and unchanged.
    Keep,
    /// Not applied yet.
    Insert(&'a Target, &'a Content),
    /// Applied, but no stored content matches the target anymore.
    Update(&'a Target, &'a Content),
}

fn decide<'a>(
    current: &RepositoryState,
    path: &Path,
    targets: &'a TargetMap,
    contents: &'a ContentList,
) -> SyncResult<Decision<'a>> {
    let target = targets
        .get(path)
        .ok_or_else(|| SyncError::missing_target(path))?;

    let applied = current.contains(path);
    if applied && current.contents().find_content(path, target).is_some() {
        return Ok(Decision::Keep);
    }

    let content = contents
        .find_content(path, target)
        .ok_or_else(|| SyncError::missing_content(path))?;

    Ok(if applied {
        Decision::Update(target, content)
    } else {
        Decision::Insert(target, content)
    })
}

/// Records into `txn` the operations that turn `current` into the state
/// described by `paths`, `targets` and `contents`.
///
/// Applied paths missing from `paths` are deleted. The targets version and
/// the opaque backend state are always recorded. Nothing is recorded for a
/// path that is applied with matching content.
pub fn reconcile(
    current: &RepositoryState,
    txn: &mut Transaction,
    paths: &[Path],
    targets: &TargetMap,
    contents: &ContentList,
) -> SyncResult<()> {
    let listed: BTreeSet<&Path> = paths.iter().collect();

    for applied in current.paths() {
        if !listed.contains(applied) {
            txn.delete(applied.clone());
        }
    }

    for path in paths {
        match decide(current, path, targets, contents)? {
            Decision::Keep => {}
            Decision::Insert(target, content) => {
                txn.insert(path.clone(), target.clone(), content.clone())
            }
            Decision::Update(target, content) => {
                txn.update(path.clone(), target.clone(), content.clone())
            }
        }
    }

    txn.set_opaque_backend_state(targets.opaque_backend_state().map(str::to_string));
    txn.set_targets_version(targets.version());

    Ok(())
}
