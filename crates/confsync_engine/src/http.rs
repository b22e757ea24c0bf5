//! HTTP transport implementation.
//!
//! The request is POSTed as JSON to the agent's configuration endpoint. The
//! actual HTTP client is abstracted via a trait so any library (ureq,
//! reqwest, hyper) or an in-process fake can be plugged in.

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use confsync_protocol::{ConfigRequest, ConfigResponse, TargetFile};
use parking_lot::RwLock;
use serde::Deserialize;

/// Path of the configuration endpoint on the agent.
pub const CONFIG_ENDPOINT: &str = "/v0.7/config";

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual network I/O.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body.
    ///
    /// Returns `Err` only when no HTTP response was received at all.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

/// Agent transport over HTTP.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the agent (e.g., "http://localhost:8126").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the full URL requests are sent to.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CONFIG_ENDPOINT)
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        let body =
            serde_json::to_vec(request).map_err(|e| TransportError::Encode(e.to_string()))?;

        let response = self.client.post(&self.url(), body).map_err(|e| {
            self.set_error(&e);
            TransportError::Request(e)
        })?;

        self.clear_error();

        if response.status != 200 {
            tracing::debug!(status = response.status, "agent did not serve the request");
            return Ok(ConfigResponse::not_ok());
        }

        decode_agent_body(&response.body)
    }
}

/// Shape of a 200 response body.
#[derive(Debug, Deserialize)]
struct AgentBody {
    #[serde(default)]
    roots: Vec<String>,
    #[serde(default)]
    targets: Option<String>,
    #[serde(default)]
    target_files: Vec<TargetFile>,
    #[serde(default)]
    client_configs: Vec<String>,
}

/// Decodes the JSON body of a successful agent response.
///
/// The agent sends the signed targets manifest as a base64 string; it is
/// decoded to JSON here. Target file payloads stay base64 until parsed.
pub fn decode_agent_body(body: &[u8]) -> TransportResult<ConfigResponse> {
    let raw: AgentBody =
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    let targets = match raw.targets.as_deref() {
        Some(encoded) if !encoded.is_empty() => {
            let manifest = STANDARD
                .decode(encoded)
                .map_err(|e| TransportError::Decode(format!("targets: {}", e)))?;
            Some(
                serde_json::from_slice(&manifest)
                    .map_err(|e| TransportError::Decode(format!("targets: {}", e)))?,
            )
        }
        _ => None,
    };

    Ok(ConfigResponse {
        ok: true,
        roots: raw.roots,
        targets,
        target_files: raw.target_files,
        client_configs: raw.client_configs,
    })
}
