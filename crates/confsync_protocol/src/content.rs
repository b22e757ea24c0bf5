//! Configuration payloads.

use crate::error::{ParseError, ParseResult};
use crate::messages::TargetFile;
use crate::path::Path;
use crate::target::Target;
use crate::SHA256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Application status of a configuration, reported back to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApplyState {
    /// Nothing is known about the application of this configuration.
    #[default]
    Unknown,
    /// The configuration was stored but not yet handed to its product.
    Unacknowledged,
    /// The configuration was handed to its product.
    Acknowledged,
    /// The product failed to apply the configuration.
    Error(String),
}

impl ApplyState {
    /// Returns the numeric code used on the wire.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            ApplyState::Unknown => 0,
            ApplyState::Unacknowledged => 1,
            ApplyState::Acknowledged => 2,
            ApplyState::Error(_) => 3,
        }
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            ApplyState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Raw payload of one configuration file.
///
/// Digests are computed once, when the content is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    path: Path,
    data: Vec<u8>,
    length: u64,
    hashes: BTreeMap<String, String>,
    version: u64,
    apply_state: ApplyState,
}

impl Content {
    /// Creates a content for a path, computing its digests.
    pub fn new(path: Path, data: Vec<u8>) -> Self {
        let digest = hex::encode(Sha256::digest(&data));
        let mut hashes = BTreeMap::new();
        hashes.insert(SHA256.to_string(), digest);

        Self {
            path,
            length: data.len() as u64,
            data,
            hashes,
            version: 0,
            apply_state: ApplyState::Unknown,
        }
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns the hex digest for an algorithm, if computed.
    #[must_use]
    pub fn hexdigest(&self, algorithm: &str) -> Option<&str> {
        self.hashes.get(algorithm).map(String::as_str)
    }

    /// Returns all digests keyed by algorithm.
    #[must_use]
    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// Returns the version of the target this content was applied with.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the application status.
    #[must_use]
    pub fn apply_state(&self) -> &ApplyState {
        &self.apply_state
    }

    /// Sets the version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Sets the application status.
    pub fn set_apply_state(&mut self, state: ApplyState) {
        self.apply_state = state;
    }
}

/// Ordered collection of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentList {
    items: Vec<Content>,
}

impl ContentList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses target files from an agent response.
    ///
    /// Each `raw` field is base64-decoded and digested.
    pub fn parse(files: &[TargetFile]) -> ParseResult<Self> {
        let mut items = Vec::with_capacity(files.len());
        for file in files {
            let path = Path::parse(&file.path)?;
            let data = STANDARD
                .decode(file.raw.as_bytes())
                .map_err(|e| ParseError::InvalidContent {
                    path: file.path.clone(),
                    reason: e.to_string(),
                })?;
            items.push(Content::new(path, data));
        }
        Ok(Self { items })
    }

    /// Finds a content for `path` that matches `target`.
    ///
    /// A digest or length mismatch is a miss.
    #[must_use]
    pub fn find_content(&self, path: &Path, target: &Target) -> Option<&Content> {
        self.items
            .iter()
            .find(|c| c.path() == path && target.check(c))
    }

    /// Returns the first content for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Content> {
        self.items.iter().find(|c| c.path() == path)
    }

    /// Returns the first content for a path, mutably.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Content> {
        self.items.iter_mut().find(|c| c.path() == path)
    }

    /// Returns true if a content exists for the path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Appends a content.
    pub fn push(&mut self, content: Content) {
        self.items.push(content);
    }

    /// Replaces the content for its path in place, or appends it.
    ///
    /// Returns the replaced content.
    pub fn upsert(&mut self, content: Content) -> Option<Content> {
        match self.get_mut(content.path()) {
            Some(slot) => Some(std::mem::replace(slot, content)),
            None => {
                self.items.push(content);
                None
            }
        }
    }

    /// Removes the content for a path.
    pub fn remove(&mut self, path: &Path) -> Option<Content> {
        let index = self.items.iter().position(|c| c.path() == path)?;
        Some(self.items.remove(index))
    }

    /// Iterates over the paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(Content::path)
    }

    /// Iterates over the contents in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Content> {
        self.items.iter()
    }

    /// Returns the number of contents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ContentList {
    type Item = &'a Content;
    type IntoIter = std::slice::Iter<'a, Content>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
