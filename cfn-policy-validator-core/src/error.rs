//! Crate-level error type for the CloudFormation policy validator.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aws::AwsError;

/// Errors that abort a validation run.
///
/// Per-policy remote failures never surface here; they are recorded as
/// skipped policies in the [`ValidationReport`](crate::ValidationReport).
#[derive(Debug, Error)]
pub enum CfnPolicyValidatorError {
    /// The template path does not point at an existing file.
    #[error("Template file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// A filesystem operation failed.
    #[error("Failed to {operation} '{}': {source}", .path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template content could not be parsed.
    #[error("Failed to parse template: {0}")]
    Parsing(String),

    /// The template parsed but does not have the expected shape.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CfnPolicyValidatorError {
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing(message.into())
    }

    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }

    pub fn file_system(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type CfnPolicyValidatorResult<T> = Result<T, CfnPolicyValidatorError>;
