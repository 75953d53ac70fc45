//! This crate provides the core logic of the CloudFormation policy validator:
//! - CloudFormation template loading (JSON and YAML, short-form intrinsics included)
//! - IAM policy extraction from managed policies and role inline policies
//! - `Fn::Sub` account id / region resolution
//! - Validation through IAM Access Analyzer with retry, and result reporting
//!

mod aws;
pub mod commands;
mod error;
pub mod substitution;
pub mod template;
mod types;
pub mod validation;

// Re-exports for a small, focused public API
pub use aws::{
    AccountIdentity, AwsAccessAnalyzerClient, AwsError, AwsResult, AwsStsClient, PolicyAnalyzer,
};
pub use commands::{CfnPolicyValidatorService, ValidateOptions};
pub use error::{CfnPolicyValidatorError, CfnPolicyValidatorResult};
pub use substitution::{resolve_substitutions, SubstitutionContext};
pub use template::{extract_policies, Template, TemplateFormat};
pub use types::{
    Finding, FindingLocation, PathSegment, PolicyOutcome, PolicyRecord, PolicySource,
    RenderedFinding, SkipReason, SkippedPolicy, ValidationReport, ValidationResults,
};
pub use validation::{PolicyValidator, RetryPolicy};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_and_resolve_sample_template() {
        let template = Template::parse(
            r#"
Resources:
  QueuePolicy:
    Type: AWS::IAM::ManagedPolicy
    Properties:
      PolicyDocument:
        Version: "2012-10-17"
        Statement:
          - Effect: Allow
            Action: sqs:SendMessage
            Resource: !Sub arn:aws:sqs:${AWS::Region}:${AWS::AccountId}:jobs
"#,
            TemplateFormat::Yaml,
        )
        .expect("should parse");

        let records = resolve_substitutions(
            extract_policies(&template).expect("should extract"),
            &SubstitutionContext::new("123456789012", "us-east-1"),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].policy_document["Statement"][0]["Resource"],
            "arn:aws:sqs:us-east-1:123456789012:jobs"
        );
    }
}
