//! Test fixtures for manifests, responses and receivers.
//!
//! Builders compute lengths, sha256 digests and base64 payloads so tests
//! only state paths, bytes and versions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use confsync_core::{Change, ChangeKind, RepositoryState};
use confsync_engine::{Receiver, ReceiverError};
use confsync_protocol::{ConfigResponse, TargetFile};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A vendor rules path.
pub const RULES_PATH: &str = "datadog/2/ASM_DD/blocked/config";
/// A feature toggle path.
pub const FEATURES_PATH: &str = "datadog/2/ASM_FEATURES/asm_features_activation/config";
/// A user data path.
pub const DATA_PATH: &str = "datadog/2/ASM_DATA/blocked_ips/config";
/// An employee-sourced path.
pub const EMPLOYEE_PATH: &str = "employee/ASM_DD/1.recommended.json/config";

/// Returns the lowercase hex sha256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Builds a signed targets manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    version: u64,
    targets: Map<String, Value>,
    opaque_backend_state: Option<String>,
    expires: Option<String>,
}

impl ManifestBuilder {
    /// Starts a manifest with the given targets version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Adds a target describing `data` at `version`.
    pub fn target(self, path: &str, data: &[u8], version: u64) -> Self {
        self.raw_target(path, data.len() as u64, &sha256_hex(data), version)
    }

    /// Adds a target with explicit length and digest.
    pub fn raw_target(mut self, path: &str, length: u64, sha256: &str, version: u64) -> Self {
        self.targets.insert(
            path.to_string(),
            json!({
                "length": length,
                "hashes": { "sha256": sha256 },
                "custom": { "v": version }
            }),
        );
        self
    }

    /// Sets the opaque backend state.
    pub fn opaque_backend_state(mut self, state: impl Into<String>) -> Self {
        self.opaque_backend_state = Some(state.into());
        self
    }

    /// Sets the expiry timestamp.
    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    /// Builds the manifest JSON.
    pub fn build(self) -> Value {
        let mut signed = json!({
            "_type": "targets",
            "version": self.version,
            "targets": self.targets,
        });
        if let Some(state) = self.opaque_backend_state {
            signed["custom"] = json!({ "opaque_backend_state": state });
        }
        if let Some(expires) = self.expires {
            signed["expires"] = json!(expires);
        }
        json!({ "signatures": [], "signed": signed })
    }
}

/// Builds an agent response whose manifest, files and path list agree.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    manifest: ManifestBuilder,
    client_configs: Vec<String>,
    target_files: Vec<TargetFile>,
}

impl ResponseBuilder {
    /// Starts a response with the given targets version.
    pub fn new(version: u64) -> Self {
        Self {
            manifest: ManifestBuilder::new(version),
            client_configs: Vec::new(),
            target_files: Vec::new(),
        }
    }

    /// Lists `path` with content `data` at config version 1.
    pub fn config(self, path: &str, data: &[u8]) -> Self {
        self.versioned_config(path, data, 1)
    }

    /// Lists `path` with content `data` at `version`.
    pub fn versioned_config(mut self, path: &str, data: &[u8], version: u64) -> Self {
        self.manifest = self.manifest.target(path, data, version);
        self.client_configs.push(path.to_string());
        self.target_files.push(TargetFile {
            path: path.to_string(),
            raw: STANDARD.encode(data),
        });
        self
    }

    /// Lists `path` and describes it in the manifest without sending its file.
    ///
    /// This is what the agent sends for a config the client already has.
    pub fn cached_config(mut self, path: &str, data: &[u8], version: u64) -> Self {
        self.manifest = self.manifest.target(path, data, version);
        self.client_configs.push(path.to_string());
        self
    }

    /// Lists `path` without any manifest entry or file.
    pub fn listed_only(mut self, path: &str) -> Self {
        self.client_configs.push(path.to_string());
        self
    }

    /// Adds a target file with a raw payload, as is.
    pub fn raw_file(mut self, path: &str, raw: &str) -> Self {
        self.target_files.push(TargetFile {
            path: path.to_string(),
            raw: raw.to_string(),
        });
        self
    }

    /// Sets the opaque backend state.
    pub fn opaque_backend_state(mut self, state: impl Into<String>) -> Self {
        self.manifest = self.manifest.opaque_backend_state(state);
        self
    }

    /// Builds the response.
    pub fn build(self) -> ConfigResponse {
        ConfigResponse::new(self.client_configs, self.manifest.build(), self.target_files)
    }
}

/// Encodes a response the way the agent puts it on the wire.
///
/// Returns `None` for a response that is not ok, since the agent answers
/// those with a non-200 status and no usable body.
pub fn agent_body(response: &ConfigResponse) -> Option<Vec<u8>> {
    if !response.ok {
        return None;
    }

    let mut body = Map::new();
    if !response.roots.is_empty() {
        body.insert("roots".into(), json!(response.roots));
    }
    if let Some(targets) = &response.targets {
        let encoded = serde_json::to_vec(targets).expect("manifest serializes");
        body.insert("targets".into(), json!(STANDARD.encode(encoded)));
    }
    if !response.target_files.is_empty() {
        body.insert("target_files".into(), json!(response.target_files));
    }
    if !response.client_configs.is_empty() {
        body.insert("client_configs".into(), json!(response.client_configs));
    }

    Some(serde_json::to_vec(&Value::Object(body)).expect("body serializes"))
}

/// One call recorded by a [`RecordingReceiver`].
pub type RecordedBatch = Vec<(ChangeKind, String)>;

/// A receiver that records every batch it is handed.
pub struct RecordingReceiver {
    products: Vec<String>,
    batches: Mutex<Vec<RecordedBatch>>,
    failure: Mutex<Option<String>>,
}

impl RecordingReceiver {
    /// Creates a receiver for `products`.
    pub fn new<I, S>(products: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            products: products.into_iter().map(Into::into).collect(),
            batches: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    /// Makes every following call fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Makes following calls succeed again.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Returns the recorded batches.
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().clone()
    }

    /// Returns every recorded change, flattened.
    pub fn changes(&self) -> RecordedBatch {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    /// Returns the number of calls.
    pub fn calls(&self) -> usize {
        self.batches.lock().len()
    }
}

impl Receiver for RecordingReceiver {
    fn products(&self) -> &[String] {
        &self.products
    }

    fn apply(&self, changes: &[&Change], _state: &RepositoryState) -> Result<(), ReceiverError> {
        self.batches.lock().push(
            changes
                .iter()
                .map(|change| (change.kind(), change.path().to_string()))
                .collect(),
        );
        match self.failure.lock().as_ref() {
            Some(message) => Err(ReceiverError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsync_protocol::{ContentList, Path, TargetMap};

    #[test]
    fn built_response_is_consistent() {
        let response = ResponseBuilder::new(5)
            .config(RULES_PATH, b"{\"rules\":[]}")
            .opaque_backend_state("state")
            .build();

        let targets = TargetMap::parse(response.targets.as_ref().unwrap()).unwrap();
        let contents = ContentList::parse(&response.target_files).unwrap();
        let path = Path::parse(RULES_PATH).unwrap();

        assert_eq!(targets.version(), 5);
        assert_eq!(targets.opaque_backend_state(), Some("state"));
        assert!(contents.find_content(&path, targets.get(&path).unwrap()).is_some());
    }

    #[test]
    fn agent_body_encodes_manifest() {
        let response = ResponseBuilder::new(1).config(DATA_PATH, b"[]").build();
        let body: Value = serde_json::from_slice(&agent_body(&response).unwrap()).unwrap();
        assert!(body["targets"].is_string());
        assert_eq!(body["client_configs"][0], DATA_PATH);
        assert!(agent_body(&ConfigResponse::not_ok()).is_none());
    }
}
