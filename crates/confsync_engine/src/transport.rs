//! Transport abstraction for talking to the agent.

use crate::error::{TransportError, TransportResult};
use confsync_protocol::{ConfigRequest, ConfigResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Exchanges configuration messages with the agent.
///
/// Calls are blocking. Implementations are responsible for bounding them
/// with their own timeout.
pub trait Transport: Send + Sync {
    /// Sends the client state and returns the agent's answer.
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        (**self).send_config(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        (**self).send_config(request)
    }
}

/// A mock transport for testing.
///
/// Answers are taken from a queue in order; once it is drained, the fallback
/// answer is returned. Every request is recorded.
#[derive(Debug)]
pub struct MockTransport {
    scripted: Mutex<VecDeque<TransportResult<ConfigResponse>>>,
    fallback: Mutex<TransportResult<ConfigResponse>>,
    requests: Mutex<Vec<ConfigRequest>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a mock that answers every request with an empty response.
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(ConfigResponse::empty())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response.
    pub fn push_response(&self, response: ConfigResponse) {
        self.scripted.lock().push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.scripted.lock().push_back(Err(error));
    }

    /// Sets the answer used once the queue is drained.
    pub fn set_fallback(&self, answer: TransportResult<ConfigResponse>) {
        *self.fallback.lock() = answer;
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

    /// Returns the number of queued answers not yet consumed.
    pub fn pending(&self) -> usize {
        self.scripted.lock().len()
    }
}

impl Transport for MockTransport {
    fn send_config(&self, request: &ConfigRequest) -> TransportResult<ConfigResponse> {
        self.requests.lock().push(request.clone());
        let scripted = self.scripted.lock().pop_front();
        match scripted {
            Some(answer) => answer,
            None => self.fallback.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsync_protocol::{ClientInfo, ClientState, ClientTracer};

    fn request(id: &str) -> ConfigRequest {
        ConfigRequest {
            client: ClientInfo {
                state: ClientState {
                    root_version: 1,
                    targets_version: 0,
                    config_states: Vec::new(),
                    has_error: false,
                    error: String::new(),
                    backend_client_state: None,
                },
                id: id.to_string(),
                products: vec!["ASM_DD".into()],
                is_tracer: true,
                is_agent: false,
                client_tracer: ClientTracer {
                    runtime_id: "rid".into(),
                    language: "rust".into(),
                    tracer_version: "0.0.0".into(),
                    service: "svc".into(),
                    env: "test".into(),
                    tags: Vec::new(),
                    app_version: None,
                },
                capabilities: "AA==".into(),
            },
            cached_target_files: Vec::new(),
        }
    }

    #[test]
    fn scripted_answers_then_fallback() {
        let transport = MockTransport::new();
        transport.push_response(ConfigResponse::not_ok());
        transport.push_error(TransportError::Request("refused".into()));

        assert!(!transport.send_config(&request("a")).unwrap().ok);
        assert!(transport.send_config(&request("b")).is_err());
        assert_eq!(transport.pending(), 0);

        let fallback = transport.send_config(&request("c")).unwrap();
        assert!(fallback.ok);
        assert!(fallback.is_empty());

        transport.set_fallback(Err(TransportError::Request("down".into())));
        assert!(transport.send_config(&request("d")).is_err());
    }

    #[test]
    fn records_requests() {
        let transport = Arc::new(MockTransport::new());
        transport.send_config(&request("first")).unwrap();
        transport.send_config(&request("second")).unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[0].client.id, "first");
        assert_eq!(transport.last_request().unwrap().client.id, "second");
    }
}
