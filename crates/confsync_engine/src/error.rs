//! Error types for the remote configuration engine.

use confsync_core::CoreError;
use confsync_protocol::ParseError;
use thiserror::Error;

/// Result type for reconciliation.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for component lifecycle operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Protocol-level failure while reconciling a response.
///
/// The cycle is aborted and the applied state is left untouched. The client
/// that raised it stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The response could not be parsed.
    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),

    /// A listed path has no entry in the targets manifest.
    #[error("no target for path '{path}'")]
    MissingTarget {
        /// The path.
        path: String,
    },

    /// A new or changed path has no target file matching its target.
    #[error("no valid content for target at path '{path}'")]
    MissingContent {
        /// The path.
        path: String,
    },

    /// The reconciliation transaction was rejected by the repository.
    #[error("repository error: {0}")]
    Repository(#[from] CoreError),
}

impl SyncError {
    /// Creates a missing target error.
    pub fn missing_target(path: impl ToString) -> Self {
        Self::MissingTarget {
            path: path.to_string(),
        }
    }

    /// Creates a missing content error.
    pub fn missing_content(path: impl ToString) -> Self {
        Self::MissingContent {
            path: path.to_string(),
        }
    }
}

/// Failure to exchange a message with the agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be delivered or answered.
    #[error("request failed: {0}")]
    Request(String),

    /// The request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure reported by a receiver while applying changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("receiver failed: {message}")]
pub struct ReceiverError {
    message: String,
}

impl ReceiverError {
    /// Creates a receiver error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a failed client sync.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Protocol-level failure; the client is kept.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A receiver rejected a change.
    #[error("dispatch error: {0}")]
    Receiver(#[from] ReceiverError),

    /// The acknowledgement commit was rejected.
    #[error("acknowledgement failed: {0}")]
    Acknowledge(CoreError),
}

impl ClientError {
    /// Returns true for protocol-level failures that leave the client usable.
    pub fn is_sync_error(&self) -> bool {
        matches!(self, ClientError::Sync(_))
    }
}

/// Component lifecycle failure.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
