//! Messages exchanged with the agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration request sent on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRequest {
    /// Client description and state.
    pub client: ClientInfo,
    /// Files already held by the client, so the agent can skip resending them.
    pub cached_target_files: Vec<CachedTargetFile>,
}

/// Client section of a configuration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Repository state as last applied.
    pub state: ClientState,
    /// Client ID (uuid, unique per client instance).
    pub id: String,
    /// Products the client consumes.
    pub products: Vec<String>,
    /// Always true for this client.
    pub is_tracer: bool,
    /// Always false for this client.
    pub is_agent: bool,
    /// Identity of the hosting process.
    pub client_tracer: ClientTracer,
    /// Base64 capability token.
    pub capabilities: String,
}

/// Repository state reported to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    /// Root metadata version.
    pub root_version: u64,
    /// Targets manifest version last applied.
    pub targets_version: u64,
    /// Per-configuration application status.
    pub config_states: Vec<ConfigState>,
    /// Whether the previous sync failed.
    pub has_error: bool,
    /// Error message of the previous sync, empty when none.
    pub error: String,
    /// Opaque backend state echoed back verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_client_state: Option<String>,
}

/// Application status of one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigState {
    /// Configuration ID.
    pub id: String,
    /// Configuration version.
    pub version: u64,
    /// Product the configuration belongs to.
    pub product: String,
    /// Application state code.
    pub apply_state: u8,
    /// Application error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_error: Option<String>,
}

/// Identity of the process hosting the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTracer {
    /// Runtime ID.
    pub runtime_id: String,
    /// Implementation language.
    pub language: String,
    /// Implementation version.
    pub tracer_version: String,
    /// Service name.
    pub service: String,
    /// Environment name.
    pub env: String,
    /// Extra tags.
    pub tags: Vec<String>,
    /// Application version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// A file the client already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTargetFile {
    /// Raw path.
    pub path: String,
    /// Length in bytes.
    pub length: u64,
    /// Digests of the file.
    pub hashes: Vec<CachedHash>,
}

/// One digest of a cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedHash {
    /// Hash algorithm.
    pub algorithm: String,
    /// Hex digest.
    pub hash: String,
}

/// A target file as returned by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFile {
    /// Raw path.
    pub path: String,
    /// Base64-encoded payload.
    pub raw: String,
}

/// Response to a configuration request.
///
/// `ok` is false when the agent could not serve the request. An ok response
/// without any field set means "nothing new".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigResponse {
    /// Whether the agent served the request.
    pub ok: bool,
    /// Signed root metadata, carried through untouched.
    pub roots: Vec<String>,
    /// Decoded signed targets manifest.
    pub targets: Option<Value>,
    /// Target files.
    pub target_files: Vec<TargetFile>,
    /// Exhaustive list of paths the client should have applied.
    pub client_configs: Vec<String>,
}

impl ConfigResponse {
    /// Creates an ok response carrying a manifest.
    pub fn new(client_configs: Vec<String>, targets: Value, target_files: Vec<TargetFile>) -> Self {
        Self {
            ok: true,
            roots: Vec::new(),
            targets: Some(targets),
            target_files,
            client_configs,
        }
    }

    /// Creates an ok response without any update.
    pub fn empty() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    /// Creates a response for a request the agent could not serve.
    pub fn not_ok() -> Self {
        Self::default()
    }

    /// Returns true if the response carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
            && self.targets.is_none()
            && self.target_files.is_empty()
            && self.client_configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_emptiness() {
        assert!(ConfigResponse::empty().is_empty());
        assert!(ConfigResponse::empty().ok);
        assert!(!ConfigResponse::not_ok().ok);

        let response = ConfigResponse::new(vec![], json!({ "signed": {} }), vec![]);
        assert!(!response.is_empty());
    }

    #[test]
    fn request_serializes_agent_field_names() {
        let request = ConfigRequest {
            client: ClientInfo {
                state: ClientState {
                    root_version: 1,
                    targets_version: 0,
                    config_states: vec![],
                    has_error: false,
                    error: String::new(),
                    backend_client_state: None,
                },
                id: "id".into(),
                products: vec!["ASM_FEATURES".into()],
                is_tracer: true,
                is_agent: false,
                client_tracer: ClientTracer {
                    runtime_id: "rt".into(),
                    language: "rust".into(),
                    tracer_version: "0.3.0".into(),
                    service: "svc".into(),
                    env: "prod".into(),
                    tags: vec![],
                    app_version: None,
                },
                capabilities: "Ag==".into(),
            },
            cached_target_files: vec![],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["client"]["state"]["root_version"], json!(1));
        assert_eq!(value["client"]["is_tracer"], json!(true));
        assert_eq!(value["client"]["capabilities"], json!("Ag=="));
        assert!(value["client"]["state"].get("backend_client_state").is_none());
        assert!(value["client"]["client_tracer"].get("app_version").is_none());
    }
}
