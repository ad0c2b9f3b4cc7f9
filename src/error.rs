//! Error types for the fuzztriage campaign tooling.
//!
//! The triage core (classifier, location extractors, anonymizer) is made of
//! total functions and never produces an error; everything here belongs to
//! the tool layer around it: spawning targets, reading sample files, and
//! resolving harvest configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvesting and reproduction operations.
#[derive(Debug, Error)]
pub enum TriageToolError {
    /// Target or debugger process could not be spawned
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Bookkeeping operation exceeded its time budget
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Fuzzer family key not present in the registry
    #[error("Unknown fuzzer type: {0}")]
    UnknownFuzzer(String),

    /// Target binary missing or not a file
    #[error("Target binary not found: {0}")]
    BinaryNotFound(PathBuf),

    /// Sync dir missing, unreadable, or without instance dirs
    #[error("Invalid sync dir {path}: {message}")]
    SyncDir { path: PathBuf, message: String },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for fuzztriage operations
pub type Result<T> = std::result::Result<T, TriageToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TriageToolError::UnknownFuzzer("hodor".to_string());
        assert_eq!(err.to_string(), "Unknown fuzzer type: hodor");

        let err = TriageToolError::Timeout { seconds: 30 };
        assert_eq!(err.to_string(), "Operation timed out after 30s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TriageToolError = io.into();
        assert!(matches!(err, TriageToolError::Io(_)));
    }
}
