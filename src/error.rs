//! Error types for the Falx library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`FalxError`] enum. The three failures a caller of the classifier core is
//! expected to handle are [`FalxError::Storage`] (the counter store could not
//! be read or written), [`FalxError::NoTrainingData`] (a Bayes decision was
//! requested before anything was trained) and [`FalxError::InvalidFeature`]
//! (the feature extractor produced a token that cannot be used as a key).
//!
//! # Examples
//!
//! ```
//! use falx::error::{FalxError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FalxError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Falx operations.
#[derive(Error, Debug)]
pub enum FalxError {
    /// I/O errors (file operations, directory walking, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The counter store is unreachable or returned inconsistent data.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A Bayes decision was requested before any category was trained.
    #[error("No training data: no category has been trained yet")]
    NoTrainingData,

    /// The feature extractor yielded a token unusable as a storage key.
    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with FalxError.
pub type Result<T> = std::result::Result<T, FalxError>;

impl FalxError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        FalxError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        FalxError::Analysis(msg.into())
    }

    /// Create a new invalid feature error.
    pub fn invalid_feature<S: Into<String>>(msg: S) -> Self {
        FalxError::InvalidFeature(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        FalxError::Other(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        FalxError::Other(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FalxError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Whether callers should fall back to a default verdict instead of
    /// aborting: the store was unavailable or nothing has been trained.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FalxError::Storage(_) | FalxError::NoTrainingData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = FalxError::storage("connection refused");
        assert_eq!(error.to_string(), "Storage error: connection refused");

        let error = FalxError::invalid_feature("empty token");
        assert_eq!(error.to_string(), "Invalid feature: empty token");

        let error = FalxError::analysis("bad pattern");
        assert_eq!(error.to_string(), "Analysis error: bad pattern");

        let error = FalxError::invalid_argument("negative threshold");
        assert_eq!(
            error.to_string(),
            "Error: Invalid argument: negative threshold"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let falx_error = FalxError::from(io_error);

        match falx_error {
            FalxError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(FalxError::NoTrainingData.is_recoverable());
        assert!(FalxError::storage("down").is_recoverable());
        assert!(!FalxError::invalid_feature("").is_recoverable());
    }
}
