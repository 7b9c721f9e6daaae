//! Error taxonomy shared by the trainer and the predictor service

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Training input is missing columns or has no usable rows
    #[error("data error: {0}")]
    Data(String),

    /// Artifact or dataset file could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact exists but cannot be trusted (parse failure, checksum mismatch, bad schema)
    #[error("corrupt artifact {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    /// Client sent an unusable prediction request
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldViolation>),

    /// Prediction requested while the model is not ready
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Unexpected scoring failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = Error::Validation(vec![
            FieldViolation::new("Glucose", "must be >= 50"),
            FieldViolation::new("Age", "field required"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Glucose: must be >= 50"));
        assert!(msg.contains("Age: field required"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io(
            "/tmp/missing/model.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing/model.json"));
        assert!(!err.is_client_error());
    }
}
