//! Signed manifest targets.

use crate::content::Content;
use crate::error::{ParseError, ParseResult};
use crate::path::Path;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Expected content metadata for one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    hashes: BTreeMap<String, String>,
    length: u64,
    custom: Value,
}

impl Target {
    /// Creates a target with the given length and digests (algorithm → hex).
    ///
    /// Algorithm names and digests are lowercased.
    pub fn new<I, A, H>(length: u64, hashes: I) -> Self
    where
        I: IntoIterator<Item = (A, H)>,
        A: Into<String>,
        H: Into<String>,
    {
        Self {
            hashes: hashes
                .into_iter()
                .map(|(a, h)| {
                    (
                        a.into().to_ascii_lowercase(),
                        h.into().to_ascii_lowercase(),
                    )
                })
                .collect(),
            length,
            custom: Value::Null,
        }
    }

    /// Sets the custom fields.
    pub fn with_custom(mut self, custom: Value) -> Self {
        self.custom = custom;
        self
    }

    /// Returns the expected digests keyed by algorithm.
    #[must_use]
    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// Returns the expected content length in bytes.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns the custom fields.
    #[must_use]
    pub fn custom(&self) -> &Value {
        &self.custom
    }

    /// Returns the configuration version (`custom.v`), or 0 when absent.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.custom.get("v").and_then(Value::as_u64).unwrap_or(0)
    }

    /// Checks whether a content matches this target.
    ///
    /// The lengths must be equal and every digest listed by the target must
    /// match the digest the content carries for that algorithm. A digest
    /// algorithm the content does not carry is a mismatch.
    #[must_use]
    pub fn check(&self, content: &Content) -> bool {
        content.length() == self.length
            && self
                .hashes
                .iter()
                .all(|(algorithm, digest)| content.hexdigest(algorithm) == Some(digest.as_str()))
    }
}

#[derive(Deserialize)]
struct RawManifest {
    signed: RawSigned,
}

#[derive(Deserialize)]
struct RawSigned {
    #[serde(default)]
    targets: BTreeMap<String, RawTarget>,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    custom: Option<RawManifestCustom>,
    #[serde(default)]
    expires: Option<String>,
}

#[derive(Deserialize)]
struct RawManifestCustom {
    #[serde(default)]
    opaque_backend_state: Option<String>,
}

#[derive(Deserialize)]
struct RawTarget {
    #[serde(default)]
    custom: Value,
    #[serde(default)]
    hashes: BTreeMap<String, String>,
    length: u64,
}

/// Targets of a signed manifest, keyed by path.
///
/// Also carries the manifest version and the opaque backend state, which
/// must be echoed back verbatim on the next request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetMap {
    targets: BTreeMap<Path, Target>,
    version: u64,
    opaque_backend_state: Option<String>,
    expires: Option<String>,
}

impl TargetMap {
    /// Creates an empty target map with the given manifest version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Parses a decoded signed manifest.
    ///
    /// Reads `signed.targets`, `signed.version`,
    /// `signed.custom.opaque_backend_state` and `signed.expires`.
    pub fn parse(manifest: &Value) -> ParseResult<Self> {
        let raw = RawManifest::deserialize(manifest)
            .map_err(|e| ParseError::invalid_manifest(e.to_string()))?;

        let mut targets = BTreeMap::new();
        for (raw_path, raw_target) in raw.signed.targets {
            let path = Path::parse(&raw_path)?;
            let target = Target::new(raw_target.length, raw_target.hashes)
                .with_custom(raw_target.custom);
            targets.insert(path, target);
        }

        Ok(Self {
            targets,
            version: raw.signed.version,
            opaque_backend_state: raw.signed.custom.and_then(|c| c.opaque_backend_state),
            expires: raw.signed.expires,
        })
    }

    /// Sets the opaque backend state.
    pub fn with_opaque_backend_state(mut self, state: impl Into<String>) -> Self {
        self.opaque_backend_state = Some(state.into());
        self
    }

    /// Inserts a target, returning the previous one for the path.
    pub fn insert(&mut self, path: Path, target: Target) -> Option<Target> {
        self.targets.insert(path, target)
    }

    /// Looks up the target for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Target> {
        self.targets.get(path)
    }

    /// Iterates over all targets.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Target)> {
        self.targets.iter()
    }

    /// Returns the number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the manifest lists no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns the manifest version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the opaque backend state.
    #[must_use]
    pub fn opaque_backend_state(&self) -> Option<&str> {
        self.opaque_backend_state.as_deref()
    }

    /// Returns the manifest expiry timestamp, as sent by the backend.
    #[must_use]
    pub fn expires(&self) -> Option<&str> {
        self.expires.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ASM_PATH: &str = "datadog/2/ASM_FEATURES/asm_features_activation/config";

    #[test]
    fn parse_manifest() {
        let manifest = json!({
            "signatures": [],
            "signed": {
                "_type": "targets",
                "custom": { "opaque_backend_state": "eyJmb28iOiJiYXIifQ==" },
                "expires": "2030-01-01T00:00:00Z",
                "spec_version": "1.0.0",
                "targets": {
                    ASM_PATH: {
                        "custom": { "v": 3 },
                        "hashes": { "sha256": "ABCDEF" },
                        "length": 28
                    }
                },
                "version": 46915439
            }
        });

        let map = TargetMap::parse(&manifest).unwrap();
        assert_eq!(map.version(), 46915439);
        assert_eq!(map.opaque_backend_state(), Some("eyJmb28iOiJiYXIifQ=="));
        assert_eq!(map.expires(), Some("2030-01-01T00:00:00Z"));
        assert_eq!(map.len(), 1);

        let target = map.get(&Path::parse(ASM_PATH).unwrap()).unwrap();
        assert_eq!(target.length(), 28);
        assert_eq!(target.version(), 3);
        assert_eq!(target.hashes().get("sha256").map(String::as_str), Some("abcdef"));
    }

    #[test]
    fn parse_manifest_without_targets() {
        let map = TargetMap::parse(&json!({ "signed": { "version": 7 } })).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.version(), 7);
        assert_eq!(map.opaque_backend_state(), None);
    }

    #[test]
    fn parse_rejects_missing_signed() {
        let err = TargetMap::parse(&json!({})).unwrap_err();
        assert!(matches!(err, ParseError::InvalidManifest { .. }));
    }

    #[test]
    fn parse_rejects_bad_target_path() {
        let manifest = json!({
            "signed": { "targets": { "nope": { "hashes": {}, "length": 0 } }, "version": 1 }
        });
        assert_eq!(
            TargetMap::parse(&manifest).unwrap_err(),
            ParseError::invalid_path("nope")
        );
    }

    #[test]
    fn check_compares_length_and_digest() {
        let path = Path::parse(ASM_PATH).unwrap();
        let content = Content::new(path, b"hello".to_vec());
        let digest = content.hexdigest(crate::SHA256).unwrap().to_string();

        assert!(Target::new(5, [("sha256", digest.clone())]).check(&content));
        assert!(!Target::new(6, [("sha256", digest.clone())]).check(&content));
        assert!(!Target::new(5, [("sha256", "00")]).check(&content));
        assert!(!Target::new(5, [("sha512", digest)]).check(&content));
    }

    #[test]
    fn algorithm_names_are_case_insensitive() {
        let path = Path::parse(ASM_PATH).unwrap();
        let content = Content::new(path, b"hello".to_vec());
        let digest = content.hexdigest(crate::SHA256).unwrap().to_uppercase();

        let manifest = json!({
            "signed": {
                "version": 1,
                "targets": { ASM_PATH: { "length": 5, "hashes": { "SHA256": digest } } }
            }
        });
        let map = TargetMap::parse(&manifest).unwrap();
        let target = map.get(content.path()).unwrap();
        assert!(target.hashes().contains_key("sha256"));
        assert!(target.check(&content));
    }
}
