//! Immutable repository snapshot.

use confsync_protocol::{
    CachedHash, CachedTargetFile, ConfigState, Content, ContentList, Path, Target,
};
use std::collections::BTreeMap;

/// A snapshot of the applied configurations.
///
/// Snapshots are never mutated once published; a commit builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryState {
    pub(crate) contents: ContentList,
    pub(crate) targets: BTreeMap<Path, Target>,
    pub(crate) root_version: u64,
    pub(crate) targets_version: u64,
    pub(crate) opaque_backend_state: Option<String>,
}

impl Default for RepositoryState {
    fn default() -> Self {
        Self {
            contents: ContentList::new(),
            targets: BTreeMap::new(),
            root_version: 1,
            targets_version: 0,
            opaque_backend_state: None,
        }
    }
}

impl RepositoryState {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the applied contents, in application order.
    #[must_use]
    pub fn contents(&self) -> &ContentList {
        &self.contents
    }

    /// Iterates over the applied paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.contents.paths()
    }

    /// Returns true if the path is applied.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.contents.contains(path)
    }

    /// Returns the applied content for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Content> {
        self.contents.get(path)
    }

    /// Returns the target a path was applied with.
    #[must_use]
    pub fn target(&self, path: &Path) -> Option<&Target> {
        self.targets.get(path)
    }

    /// Returns the number of applied paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Returns true if nothing is applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns the root metadata version.
    #[must_use]
    pub fn root_version(&self) -> u64 {
        self.root_version
    }

    /// Returns the last applied targets manifest version.
    #[must_use]
    pub fn targets_version(&self) -> u64 {
        self.targets_version
    }

    /// Returns the opaque backend state to echo back.
    #[must_use]
    pub fn opaque_backend_state(&self) -> Option<&str> {
        self.opaque_backend_state.as_deref()
    }

    /// Per-configuration application status, as reported to the agent.
    #[must_use]
    pub fn config_states(&self) -> Vec<ConfigState> {
        self.contents
            .iter()
            .map(|content| ConfigState {
                id: content.path().config_id().to_string(),
                version: content.version(),
                product: content.path().product().to_string(),
                apply_state: content.apply_state().code(),
                apply_error: content.apply_state().error().map(str::to_string),
            })
            .collect()
    }

    /// Files held by the client, as reported to the agent.
    #[must_use]
    pub fn cached_target_files(&self) -> Vec<CachedTargetFile> {
        self.contents
            .iter()
            .map(|content| CachedTargetFile {
                path: content.path().to_string(),
                length: content.length(),
                hashes: content
                    .hashes()
                    .iter()
                    .map(|(algorithm, hash)| CachedHash {
                        algorithm: algorithm.clone(),
                        hash: hash.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}
