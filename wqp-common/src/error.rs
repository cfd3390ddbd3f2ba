//! Common error types for WQP

use std::path::PathBuf;

use thiserror::Error;

use crate::features::FeatureName;

/// Common result type for WQP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the prediction pipeline and its bootstrap
#[derive(Error, Debug)]
pub enum Error {
    /// Artifact file missing, unreadable, corrupt, or of an unsupported format
    #[error("Failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    /// A required input field was not supplied
    #[error("Missing field: {0}")]
    MissingField(FeatureName),

    /// An input field was supplied with a non-numeric value
    #[error("Invalid type for field '{field}': expected number, found {found}")]
    InvalidFieldType { field: FeatureName, found: String },

    /// Dimensionality (or feature naming) disagrees with the 11-field schema
    #[error("Schema mismatch in {context}: expected {expected}, found {found}")]
    SchemaMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Fitted parameters are unusable (non-finite, zero scale, malformed tree)
    #[error("Invalid artifact parameters: {0}")]
    InvalidParameters(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that reject a single request and leave the process serving
    pub fn is_request_error(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::InvalidFieldType { .. })
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ArtifactLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn width_mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::SchemaMismatch {
            context: context.into(),
            expected: format!("{} features", expected),
            found: format!("{} features", found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_classified() {
        assert!(Error::MissingField(FeatureName::Alcohol).is_request_error());
        assert!(Error::InvalidFieldType {
            field: FeatureName::Density,
            found: "string".to_string()
        }
        .is_request_error());

        assert!(!Error::width_mismatch("scaler", 11, 10).is_request_error());
        assert!(!Error::artifact("model.json", "truncated").is_request_error());
        assert!(!Error::Config("bad".to_string()).is_request_error());
        assert!(!Error::InvalidParameters("zero scale".to_string()).is_request_error());
    }

    #[test]
    fn test_messages_name_the_offending_field() {
        let err = Error::MissingField(FeatureName::Ph);
        assert_eq!(err.to_string(), "Missing field: pH");

        let err = Error::width_mismatch("scaler", 11, 9);
        assert_eq!(
            err.to_string(),
            "Schema mismatch in scaler: expected 11 features, found 9 features"
        );
    }
}
