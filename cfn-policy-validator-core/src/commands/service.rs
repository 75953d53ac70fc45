//! CloudFormation Policy Validator Service Layer
//!
//! The service owns the remote clients and the resolved region. The entry
//! point builds it once and every stage of a run borrows the clients from it.

use aws_sdk_accessanalyzer::Client as AccessAnalyzerClient;
use aws_sdk_sts::Client as StsClient;
use log::debug;

use crate::aws::{
    AccountIdentity, AwsAccessAnalyzerClient, AwsError, AwsStsClient, PolicyAnalyzer,
};
use crate::error::CfnPolicyValidatorResult;

/// Main service struct that holds the remote clients.
pub struct CfnPolicyValidatorService {
    pub(crate) analyzer: Box<dyn PolicyAnalyzer>,
    pub(crate) identity: Box<dyn AccountIdentity>,
    pub(crate) region: String,
}

impl CfnPolicyValidatorService {
    /// Create a service backed by real AWS clients.
    ///
    /// Credentials come from the default provider chain. `region` takes
    /// precedence over the chain's region; having neither is an error.
    pub async fn new(region: Option<String>) -> CfnPolicyValidatorResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        let region = config.region().map(ToString::to_string).ok_or_else(|| {
            AwsError::ConfigError(
                "no AWS region configured; set REGION or pass --region".to_string(),
            )
        })?;
        debug!("Using AWS region {}", region);

        Ok(Self::with_clients(
            Box::new(AwsAccessAnalyzerClient::new(AccessAnalyzerClient::new(&config))),
            Box::new(AwsStsClient::new(StsClient::new(&config))),
            region,
        ))
    }

    /// Create a service from explicit clients.
    pub fn with_clients(
        analyzer: Box<dyn PolicyAnalyzer>,
        identity: Box<dyn AccountIdentity>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            analyzer,
            identity,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account id of the caller, used for `${AWS::AccountId}`.
    pub async fn account_id(&self) -> CfnPolicyValidatorResult<String> {
        Ok(self.identity.account_id().await?)
    }

    // validate_template() is implemented in validate.rs
}
