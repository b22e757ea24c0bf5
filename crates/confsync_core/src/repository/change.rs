//! Changes produced by a committed transaction.

use confsync_protocol::{Content, Path};
use std::collections::BTreeSet;

/// Kind of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The path was not applied before.
    Insert,
    /// The path was applied with different content.
    Update,
    /// The path is no longer listed.
    Delete,
}

/// A single change to the applied configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A configuration was applied for the first time.
    Inserted {
        /// The path.
        path: Path,
        /// The new content.
        content: Content,
    },
    /// A configuration was replaced.
    Updated {
        /// The path.
        path: Path,
        /// The new content.
        content: Content,
        /// The content it replaced.
        previous: Content,
    },
    /// A configuration was removed.
    Deleted {
        /// The path.
        path: Path,
        /// The content that was removed.
        previous: Content,
    },
}

impl Change {
    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Change::Inserted { path, .. }
            | Change::Updated { path, .. }
            | Change::Deleted { path, .. } => path,
        }
    }

    /// Returns the product of the path.
    #[must_use]
    pub fn product(&self) -> &str {
        self.path().product()
    }

    /// Returns the kind of change.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Inserted { .. } => ChangeKind::Insert,
            Change::Updated { .. } => ChangeKind::Update,
            Change::Deleted { .. } => ChangeKind::Delete,
        }
    }

    /// Returns the new content, or `None` for a deletion.
    #[must_use]
    pub fn content(&self) -> Option<&Content> {
        match self {
            Change::Inserted { content, .. } | Change::Updated { content, .. } => Some(content),
            Change::Deleted { .. } => None,
        }
    }

    /// Returns the replaced or removed content.
    #[must_use]
    pub fn previous(&self) -> Option<&Content> {
        match self {
            Change::Updated { previous, .. } | Change::Deleted { previous, .. } => Some(previous),
            Change::Inserted { .. } => None,
        }
    }
}

/// Ordered changes of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over the changes in commit order.
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Returns the changes as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    /// Iterates over the changed paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.changes.iter().map(Change::path)
    }

    /// Returns the distinct products affected.
    #[must_use]
    pub fn products(&self) -> BTreeSet<&str> {
        self.changes.iter().map(Change::product).collect()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
