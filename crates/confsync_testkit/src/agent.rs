//! In-process agent double.
//!
//! Unlike `MockTransport`, which answers from a queue, the scripted agent
//! serves its currently published response to every request, the way the
//! real agent keeps serving the desired state until it changes. One-shot
//! failures can be queued on top.

use crate::fixtures::agent_body;
use confsync_engine::{HttpClient, HttpResponse, Transport, TransportError, TransportResult};
use confsync_protocol::{ConfigRequest, ConfigResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// An agent that serves a published response.
#[derive(Debug)]
pub struct ScriptedAgent {
    published: Mutex<ConfigResponse>,
    failures: Mutex<VecDeque<TransportError>>,
    requests: Mutex<Vec<ConfigRequest>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    /// Creates an agent with nothing to serve.
    pub fn new() -> Self {
        Self {
            published: Mutex::new(ConfigResponse::empty()),
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the response served from now on.
    pub fn publish(&self, response: ConfigResponse) {
        *self.published.lock() = response;
    }

    /// Makes the next request fail.
    pub fn fail_next(&self, error: TransportError) {
        self.failures.lock().push_back(error);
    }

    /// Returns the recorded requests.
    pub fn requests(&self) -> Vec<ConfigRequest> {
        self.requests.lock().clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<ConfigRequest> {
        self.requests.lock().last().cloned()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn serve(&self, request: ConfigRequest) -> TransportResult<ConfigResponse> {
        self.requests.lock().push(request);
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.published.lock().clone())
    }
}

impl Transport for ScriptedAgent {
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        self.serve(request.clone())
    }
}

impl HttpClient for ScriptedAgent {
    fn post(&self, _url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let request: ConfigRequest =
            serde_json::from_slice(&body).map_err(|e| format!("bad request body: {}", e))?;

        let response = self.serve(request).map_err(|e| e.to_string())?;
        Ok(match agent_body(&response) {
            Some(body) => HttpResponse::new(200, body),
            None => HttpResponse::new(404, Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ResponseBuilder, RULES_PATH};
    use confsync_engine::{Capabilities, Client, ClientIdentity, HttpTransport};
    use std::sync::Arc;

    #[test]
    fn serves_published_response_until_replaced() {
        let agent = Arc::new(ScriptedAgent::new());
        let client = Client::new(
            Arc::clone(&agent),
            Arc::new(Capabilities::default()),
            ClientIdentity::default(),
        );

        agent.publish(ResponseBuilder::new(1).config(RULES_PATH, b"a").build());
        assert_eq!(client.sync().unwrap().len(), 1);
        assert!(client.sync().unwrap().is_empty());

        agent.fail_next(TransportError::Request("reset by peer".into()));
        assert!(client.sync().is_err());
        assert_eq!(agent.request_count(), 3);
    }

    #[test]
    fn speaks_http() {
        let agent = ScriptedAgent::new();
        agent.publish(ResponseBuilder::new(2).config(RULES_PATH, b"{}").build());
        let transport = Arc::new(HttpTransport::new("http://agent:8126", agent));
        let client = Client::new(
            Arc::clone(&transport),
            Arc::new(Capabilities::default()),
            ClientIdentity::default(),
        );

        let changes = client.sync().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(client.repository().state().targets_version(), 2);

        assert!(client.sync().unwrap().is_empty());
    }
}
