//! AWS SDK integration: IAM Access Analyzer and STS client wrappers.
//!
//! The validator only talks to AWS through the [`PolicyAnalyzer`] and
//! [`AccountIdentity`] traits so tests can hand in fakes.

pub(crate) mod access_analyzer;
pub(crate) mod sts;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Finding;

pub use access_analyzer::AwsAccessAnalyzerClient;
pub use sts::AwsStsClient;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("STS identity error: {0}")]
    IdentityError(String),
    #[error("Access Analyzer internal server error: {0}")]
    InternalServer(String),
    #[error("Access Analyzer service error: {0}")]
    ServiceError(String),
    #[error("AWS request failed: {0}")]
    TransportError(String),
}

impl AwsError {
    /// Whether the error is a service error response worth retrying.
    ///
    /// Every error the service answers with counts, internal server errors
    /// included. Requests that never got a response do not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InternalServer(_) | Self::ServiceError(_))
    }
}

pub type AwsResult<T> = Result<T, AwsError>;

/// Remote policy analysis capability.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    /// Validate a serialized identity policy and return every finding.
    async fn validate_policy(&self, policy_document: &str) -> AwsResult<Vec<Finding>>;
}

/// Remote identity lookup capability.
#[async_trait]
pub trait AccountIdentity: Send + Sync {
    /// Account id of the caller's credentials.
    async fn account_id(&self) -> AwsResult<String>;
}
