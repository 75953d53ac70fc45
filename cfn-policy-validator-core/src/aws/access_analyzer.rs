//! IAM Access Analyzer client wrapper for policy validation

use std::future::Future;

use async_trait::async_trait;
use aws_sdk_accessanalyzer::error::{DisplayErrorContext, SdkError};
use aws_sdk_accessanalyzer::operation::validate_policy::ValidatePolicyError;
use aws_sdk_accessanalyzer::types::{Locale, PathElement, PolicyType, ValidatePolicyFinding};
use aws_sdk_accessanalyzer::Client as AccessAnalyzerClient;
use log::trace;

use crate::aws::{AwsError, AwsResult, PolicyAnalyzer};
use crate::types::{Finding, FindingLocation, PathSegment};

pub struct AwsAccessAnalyzerClient {
    client: AccessAnalyzerClient,
}

impl AwsAccessAnalyzerClient {
    pub fn new(client: AccessAnalyzerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyAnalyzer for AwsAccessAnalyzerClient {
    async fn validate_policy(&self, policy_document: &str) -> AwsResult<Vec<Finding>> {
        collect_pages(|next_token| async move {
            let output = self
                .client
                .validate_policy()
                .locale(Locale::En)
                .policy_type(PolicyType::IdentityPolicy)
                .policy_document(policy_document)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify_error)?;

            let findings: Vec<Finding> = output.findings().iter().map(convert_finding).collect();
            Ok::<_, AwsError>((findings, output.next_token().map(str::to_string)))
        })
        .await
    }
}

/// Request pages until the service stops handing back a continuation token.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> AwsResult<Vec<Finding>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = AwsResult<(Vec<Finding>, Option<String>)>>,
{
    let mut findings = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let (page, token) = fetch_page(next_token.take()).await?;
        findings.extend(page);

        match token {
            Some(token) if !token.is_empty() => {
                trace!("ValidatePolicy returned a continuation token, fetching next page");
                next_token = Some(token);
            }
            _ => break,
        }
    }

    Ok(findings)
}

fn classify_error(err: SdkError<ValidatePolicyError>) -> AwsError {
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(service_error) if service_error.is_internal_server_exception() => {
            AwsError::InternalServer(detail)
        }
        Some(_) => AwsError::ServiceError(detail),
        None => AwsError::TransportError(detail),
    }
}

fn convert_finding(finding: &ValidatePolicyFinding) -> Finding {
    Finding {
        finding_type: finding.finding_type().as_str().to_string(),
        issue_code: finding.issue_code().to_string(),
        finding_details: finding.finding_details().to_string(),
        locations: finding
            .locations()
            .iter()
            .map(|location| FindingLocation {
                path: location.path().iter().filter_map(convert_path_element).collect(),
            })
            .collect(),
        learn_more_link: finding.learn_more_link().to_string(),
    }
}

fn convert_path_element(element: &PathElement) -> Option<PathSegment> {
    match element {
        PathElement::Index(index) => Some(PathSegment::Index(*index)),
        PathElement::Key(key) => Some(PathSegment::Key(key.clone())),
        PathElement::Value(value) => Some(PathSegment::Value(value.clone())),
        PathElement::Substring(substring) => Some(PathSegment::Substring {
            start: substring.start(),
            length: substring.length(),
        }),
        _ => None,
    }
}
