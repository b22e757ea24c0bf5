//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for protocol parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while parsing agent payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A configuration path does not follow the path grammar.
    #[error("invalid path: {raw:?}")]
    InvalidPath {
        /// The offending raw path string.
        raw: String,
    },

    /// The targets manifest is structurally invalid.
    #[error("invalid targets manifest: {reason}")]
    InvalidManifest {
        /// Description of the structural error.
        reason: String,
    },

    /// A target file could not be decoded.
    #[error("invalid content for {path:?}: {reason}")]
    InvalidContent {
        /// Raw path of the target file.
        path: String,
        /// Description of the decoding error.
        reason: String,
    },
}

impl ParseError {
    /// Creates an invalid path error.
    pub fn invalid_path(raw: impl Into<String>) -> Self {
        Self::InvalidPath { raw: raw.into() }
    }

    /// Creates an invalid manifest error.
    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ParseError::invalid_path("datadog//x");
        assert_eq!(err.to_string(), "invalid path: \"datadog//x\"");

        let err = ParseError::invalid_manifest("missing signed");
        assert!(err.to_string().contains("missing signed"));
    }
}
