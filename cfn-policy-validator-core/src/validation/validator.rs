//! Per-policy validation: retries, skip handling and ignore filtering.

use log::{error, info};
use std::collections::HashSet;

use crate::aws::{AwsError, PolicyAnalyzer};
use crate::types::{
    Finding, PolicyOutcome, PolicyRecord, SkipReason, SkippedPolicy, ValidationReport,
};
use crate::validation::report::render_finding;
use crate::validation::retry::RetryPolicy;

/// Submits policy documents to a [`PolicyAnalyzer`] and builds the report.
pub struct PolicyValidator<'a> {
    analyzer: &'a dyn PolicyAnalyzer,
    retry_policy: RetryPolicy,
    ignored_finding_types: HashSet<String>,
}

impl<'a> PolicyValidator<'a> {
    pub fn new(
        analyzer: &'a dyn PolicyAnalyzer,
        ignored_finding_types: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            analyzer,
            retry_policy: RetryPolicy::default(),
            ignored_finding_types: ignored_finding_types.into_iter().collect(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    fn is_ignored(&self, finding: &Finding) -> bool {
        self.ignored_finding_types.contains(&finding.finding_type)
    }

    /// Validate one policy. Remote failures become [`PolicyOutcome::Skipped`].
    pub async fn validate_policy(&self, record: &PolicyRecord) -> PolicyOutcome {
        let document = match serde_json::to_string(&record.policy_document) {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to serialize {}: {}", record.policy_name, e);
                return PolicyOutcome::Skipped(SkipReason::RequestFailed(e.to_string()));
            }
        };

        match self
            .retry_policy
            .run(|| self.analyzer.validate_policy(&document))
            .await
        {
            Ok(findings) => PolicyOutcome::Validated(findings),
            Err(AwsError::InternalServer(detail)) => {
                error!(
                    "Failed to validate {} ({}) due to Internal Server Error",
                    record.policy_name, record.source
                );
                PolicyOutcome::Skipped(SkipReason::InternalServerError(detail))
            }
            Err(e) => {
                error!(
                    "Failed to validate {} ({}): {}",
                    record.policy_name, record.source, e
                );
                PolicyOutcome::Skipped(SkipReason::RequestFailed(e.to_string()))
            }
        }
    }

    /// Validate every record in order.
    ///
    /// `on_policy` is called before each record is submitted. A policy enters
    /// the results only if the service returned findings for it; when all of
    /// them are ignored it maps to an empty list.
    pub async fn validate_all<F>(&self, records: &[PolicyRecord], mut on_policy: F) -> ValidationReport
    where
        F: FnMut(&PolicyRecord),
    {
        let mut report = ValidationReport::default();

        for record in records {
            on_policy(record);
            match self.validate_policy(record).await {
                PolicyOutcome::Validated(findings) if findings.is_empty() => {
                    info!("No findings found for {}", record.policy_name);
                }
                PolicyOutcome::Validated(findings) => {
                    let rendered = findings
                        .iter()
                        .filter(|finding| !self.is_ignored(finding))
                        .map(render_finding)
                        .collect();
                    report.results.insert(record.policy_name.clone(), rendered);
                }
                PolicyOutcome::Skipped(reason) => report.skipped.push(SkippedPolicy {
                    policy_name: record.policy_name.clone(),
                    source: record.source.clone(),
                    reason,
                }),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::AwsResult;
    use crate::types::{FindingLocation, PathSegment, PolicySource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers from a queue, then with no findings once the queue is empty.
    struct ScriptedAnalyzer {
        responses: Mutex<VecDeque<AwsResult<Vec<Finding>>>>,
        documents: Mutex<Vec<String>>,
    }

    impl ScriptedAnalyzer {
        fn new(responses: Vec<AwsResult<Vec<Finding>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                documents: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PolicyAnalyzer for ScriptedAnalyzer {
        async fn validate_policy(&self, policy_document: &str) -> AwsResult<Vec<Finding>> {
            self.documents.lock().unwrap().push(policy_document.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn finding(finding_type: &str, issue_code: &str) -> Finding {
        Finding {
            finding_type: finding_type.to_string(),
            issue_code: issue_code.to_string(),
            finding_details: format!("{issue_code} details"),
            locations: vec![FindingLocation {
                path: vec![
                    PathSegment::Value("Statement".into()),
                    PathSegment::Index(0),
                    PathSegment::Value("Action".into()),
                ],
            }],
            learn_more_link: "https://docs.aws.amazon.com/IAM/latest/UserGuide/access-analyzer-reference-policy-checks.html".to_string(),
        }
    }

    fn record(name: &str) -> PolicyRecord {
        PolicyRecord {
            policy_name: name.to_string(),
            policy_document: json!({"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": "s3:*", "Resource": "*"}]}),
            source: PolicySource::ManagedPolicy {
                logical_id: name.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_ignored_types_are_filtered() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(vec![
            finding("SUGGESTION", "EMPTY_ARRAY_ACTION"),
            finding("SECURITY_WARNING", "PASS_ROLE_WITH_STAR_IN_RESOURCE"),
        ])]);
        let validator = PolicyValidator::new(&analyzer, vec!["SUGGESTION".to_string()])
            .with_retry_policy(RetryPolicy::no_delay(5));

        let report = validator.validate_all(&[record("AppPolicy")], |_| {}).await;

        let findings = report.results.get("AppPolicy").unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].finding_code,
            "PASS_ROLE_WITH_STAR_IN_RESOURCE (SECURITY_WARNING)"
        );
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_all_ignored_keeps_empty_entry() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(vec![finding("WARNING", "MISSING_VERSION")])]);
        let validator = PolicyValidator::new(&analyzer, vec!["WARNING".to_string()]);

        let report = validator.validate_all(&[record("Quiet")], |_| {}).await;

        assert_eq!(report.results.get("Quiet"), Some(&[][..]));
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_no_findings_leaves_no_entry() {
        let analyzer = ScriptedAnalyzer::new(vec![]);
        let validator = PolicyValidator::new(&analyzer, Vec::new());

        let report = validator.validate_all(&[record("Clean")], |_| {}).await;

        assert!(report.results.is_empty());
        assert!(report.skipped.is_empty());
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_internal_server_error_skips_policy_and_continues() {
        let mut responses: Vec<AwsResult<Vec<Finding>>> = (0..5)
            .map(|_| Err(AwsError::InternalServer("InternalServerException".into())))
            .collect();
        responses.push(Ok(Vec::new()));
        let analyzer = ScriptedAnalyzer::new(responses);
        let validator =
            PolicyValidator::new(&analyzer, Vec::new()).with_retry_policy(RetryPolicy::no_delay(5));

        let mut announced = Vec::new();
        let report = validator
            .validate_all(&[record("Flaky"), record("Healthy")], |r| {
                announced.push(r.policy_name.clone())
            })
            .await;

        assert_eq!(announced, vec!["Flaky", "Healthy"]);
        assert!(report.results.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].policy_name, "Flaky");
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::InternalServerError(_)
        ));
        assert!(report.passed());
        assert_eq!(analyzer.documents.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_other_errors_are_skipped_without_retry() {
        let analyzer = ScriptedAnalyzer::new(vec![Err(AwsError::TransportError(
            "connection refused".into(),
        ))]);
        let validator = PolicyValidator::new(&analyzer, Vec::new());

        let outcome = validator.validate_policy(&record("Offline")).await;

        assert!(matches!(
            outcome,
            PolicyOutcome::Skipped(SkipReason::RequestFailed(_))
        ));
        assert_eq!(analyzer.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_document_is_sent_as_json() {
        let analyzer = ScriptedAnalyzer::new(vec![]);
        let validator = PolicyValidator::new(&analyzer, Vec::new());

        validator.validate_policy(&record("Doc")).await;

        let sent = analyzer.documents.lock().unwrap()[0].clone();
        let parsed: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(parsed["Statement"][0]["Action"], "s3:*");
    }
}
