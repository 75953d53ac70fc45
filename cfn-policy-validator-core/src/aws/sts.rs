//! STS caller identity lookup

use async_trait::async_trait;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;

use crate::aws::{AccountIdentity, AwsError, AwsResult};

pub struct AwsStsClient {
    client: StsClient,
}

impl AwsStsClient {
    pub fn new(client: StsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountIdentity for AwsStsClient {
    async fn account_id(&self) -> AwsResult<String> {
        let response = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                AwsError::IdentityError(format!(
                    "Failed to get caller identity: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        response
            .account()
            .map(ToString::to_string)
            .ok_or_else(|| {
                AwsError::IdentityError("GetCallerIdentity response had no account".to_string())
            })
    }
}
