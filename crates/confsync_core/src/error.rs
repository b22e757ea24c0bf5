//! Error types for confsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while committing a transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An insert targeted a path that is already applied.
    #[error("path already applied: {path}")]
    AlreadyApplied {
        /// The path.
        path: String,
    },

    /// An update or status change targeted a path that is not applied.
    #[error("path not applied: {path}")]
    NotApplied {
        /// The path.
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::NotApplied {
            path: "employee/ASM/a/config".into(),
        };
        assert_eq!(err.to_string(), "path not applied: employee/ASM/a/config");
    }
}
