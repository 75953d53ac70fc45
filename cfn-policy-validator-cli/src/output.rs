//! Terminal output: parameter banner, findings and the final gate.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use cfn_policy_validator_core::validation::to_pretty_json;
use cfn_policy_validator_core::{PolicyRecord, ValidationReport, ValidationResults};
use log::warn;

use crate::OutputMode;

pub(crate) fn print_parameters(
    path: &Path,
    region: &str,
    account_id: &str,
    output: Option<OutputMode>,
    ignored_finding_types: &[String],
) {
    let output = match output {
        Some(OutputMode::Print) => "print",
        Some(OutputMode::File) => "file",
        None => "none",
    };
    println!();
    println!("Executing with the following Parameters: ");
    println!("Cloudformation path: {}", path.display());
    println!("Region: {region}");
    println!("Account ID: {account_id}");
    println!("Output Type: {output}");
    println!("Ignored Finding Types: {ignored_finding_types:?}");
    println!();
}

pub(crate) fn analysing_line(record: &PolicyRecord) -> String {
    format!("---Analysing: {} ({})---", record.policy_name, record.source)
}

pub(crate) fn print_results(out: &mut impl Write, results: &ValidationResults) -> Result<()> {
    writeln!(out, "---Findings---")?;
    writeln!(out, "{}", to_pretty_json(results)?)?;
    Ok(())
}

/// Print skipped policies and remaining findings.
pub(crate) fn print_gate(out: &mut impl Write, report: &ValidationReport) -> Result<()> {
    writeln!(out)?;
    for skipped in &report.skipped {
        warn!(
            "{} ({}) was not validated: {}",
            skipped.policy_name, skipped.source, skipped.reason
        );
        writeln!(
            out,
            "Warning: {} ({}) was not validated ({})",
            skipped.policy_name, skipped.source, skipped.reason
        )?;
    }

    for (policy_name, findings) in report.failing_policies() {
        writeln!(
            out,
            "IAA policy validator raised {} finding(s) for {}",
            findings.len(),
            policy_name
        )?;
        writeln!(out, "Findings: {}", to_pretty_json(findings)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_policy_validator_core::{PolicySource, RenderedFinding, SkipReason, SkippedPolicy};
    use serde_json::json;

    fn finding() -> RenderedFinding {
        RenderedFinding {
            finding_code: "PASS_ROLE_WITH_STAR_IN_RESOURCE (SECURITY_WARNING)".to_string(),
            finding_details: "Using iam:PassRole with wildcards can be overly permissive.".to_string(),
            location: "Statement #0, Segment 'Resource'".to_string(),
            learn_more_link: "https://docs.aws.amazon.com".to_string(),
        }
    }

    fn render(print: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        print(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_analysing_line_names_the_source() {
        let record = PolicyRecord {
            policy_name: "QueueAccess".to_string(),
            policy_document: json!({}),
            source: PolicySource::RoleInlinePolicy {
                role_logical_id: "WorkerRole".to_string(),
            },
        };
        assert_eq!(
            analysing_line(&record),
            "---Analysing: QueueAccess (inline policy of role WorkerRole)---"
        );
    }

    #[test]
    fn test_print_results_writes_pretty_json() {
        let mut results = ValidationResults::new();
        results.insert("WorkerPolicy", vec![finding()]);
        results.insert("QuietPolicy", vec![]);

        let printed = render(|out| print_results(out, &results));
        assert!(printed.starts_with("---Findings---\n{\n    \"WorkerPolicy\": ["));
        assert!(printed.contains("\"QuietPolicy\": []"));
    }

    #[test]
    fn test_print_gate_lists_failing_policies_and_skips() {
        let mut report = ValidationReport::default();
        report.results.insert("Suppressed", vec![]);
        report.results.insert("WorkerPolicy", vec![finding()]);
        report.skipped.push(SkippedPolicy {
            policy_name: "WorkerLogsPolicy".to_string(),
            source: PolicySource::ManagedPolicy {
                logical_id: "WorkerLogsPolicy".to_string(),
            },
            reason: SkipReason::InternalServerError("InternalServerException".to_string()),
        });

        let printed = render(|out| print_gate(out, &report));
        assert!(printed.contains(
            "Warning: WorkerLogsPolicy (managed policy WorkerLogsPolicy) was not validated"
        ));
        assert!(printed.contains("IAA policy validator raised 1 finding(s) for WorkerPolicy"));
        assert!(!printed.contains("for Suppressed"));
    }

    #[test]
    fn test_print_gate_is_quiet_for_a_clean_report() {
        let printed = render(|out| print_gate(out, &ValidationReport::default()));
        assert_eq!(printed, "\n");
    }
}
