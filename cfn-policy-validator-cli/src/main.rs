use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cfn_policy_validator_core::validation::report::DEFAULT_OUTPUT_DIR;
use cfn_policy_validator_core::validation::write_results_file;
use cfn_policy_validator_core::{CfnPolicyValidatorService, ValidateOptions, ValidationReport};
use clap::{Parser, ValueEnum};
use log::{debug, error, LevelFilter};

mod output;

/// Validate IAM policies in a CloudFormation template with IAM Access Analyzer.
///
/// Exits with a non-zero status when any policy still has findings after
/// removing the ignored finding types.
#[derive(Parser, Debug)]
#[command(name = "cfn-policy-validator", version, about)]
struct Cli {
    /// Path to the CloudFormation template to analyse (.json, .yaml or .yml)
    #[arg(long, value_parser = existing_file)]
    path: PathBuf,

    /// Print findings to the terminal or write them to output/results.json
    #[arg(long, value_enum)]
    output: Option<OutputMode>,

    /// Finding types excluded from the gate (ERROR, SECURITY_WARNING, SUGGESTION, WARNING)
    #[arg(long = "ignore_finding_types", num_args = 1.., value_name = "TYPE")]
    ignore_finding_types: Vec<String>,

    /// AWS region used for ${AWS::Region} and the Access Analyzer endpoint
    #[arg(long, env = "REGION")]
    region: Option<String>,

    /// Fail the run when a policy could not be validated
    #[arg(long = "fail_on_skipped")]
    fail_on_skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Print,
    File,
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("File does not exist at prescribed path: {value}"))
    }
}

/// Map a `LOGLEVEL` value to a filter. Accepts the usual level names in any
/// case, plus `WARNING`, `CRITICAL`, `FATAL` and `NOTSET`; anything else
/// falls back to `error`.
fn parse_log_level(value: Option<&str>) -> LevelFilter {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("trace" | "notset") => LevelFilter::Trace,
        Some("debug") => LevelFilter::Debug,
        Some("info") => LevelFilter::Info,
        Some("warn" | "warning") => LevelFilter::Warn,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Error,
    }
}

fn init_logging() {
    let level = parse_log_level(std::env::var("LOGLEVEL").ok().as_deref());
    env_logger::Builder::new().filter_level(level).init();
}

/// 0 when the gate passed, 1 otherwise.
fn exit_status(report: &ValidationReport, fail_on_skipped: bool) -> u8 {
    u8::from(!report.gate_passed(fail_on_skipped))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let service = CfnPolicyValidatorService::new(cli.region.clone())
        .await
        .context("Failed to initialize AWS clients")?;
    let account_id = service
        .account_id()
        .await
        .context("Failed to look up the caller's AWS account")?;

    output::print_parameters(
        &cli.path,
        service.region(),
        &account_id,
        cli.output,
        &cli.ignore_finding_types,
    );

    let options = ValidateOptions {
        ignored_finding_types: cli.ignore_finding_types.clone(),
        ..ValidateOptions::default()
    };
    let report = service
        .validate_template(&cli.path, &account_id, &options, |record| {
            println!("{}", output::analysing_line(record));
        })
        .await
        .with_context(|| format!("Failed to validate {}", cli.path.display()))?;

    let mut stdout = std::io::stdout();
    match cli.output {
        Some(OutputMode::Print) => output::print_results(&mut stdout, &report.results)?,
        Some(OutputMode::File) => {
            let path = write_results_file(&report.results, DEFAULT_OUTPUT_DIR)
                .await
                .context("Failed to write results file")?;
            debug!("Results dumped to {}", path.display());
        }
        None => {}
    }

    output::print_gate(&mut stdout, &report)?;
    Ok(ExitCode::from(exit_status(&report, cli.fail_on_skipped)))
}

#[tokio::main]
async fn main() -> ExitCode {
    // REGION and LOGLEVEL may come from a .env file in the working directory.
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_policy_validator_core::{PolicySource, RenderedFinding, SkipReason, SkippedPolicy};

    fn report_with_finding() -> ValidationReport {
        let mut report = ValidationReport::default();
        report.results.insert(
            "WorkerPolicy",
            vec![RenderedFinding {
                finding_code: "MISSING_VERSION (SUGGESTION)".to_string(),
                finding_details: "Add a Version element.".to_string(),
                location: "unknown".to_string(),
                learn_more_link: "https://docs.aws.amazon.com".to_string(),
            }],
        );
        report
    }

    fn report_with_skip() -> ValidationReport {
        let mut report = ValidationReport::default();
        report.skipped.push(SkippedPolicy {
            policy_name: "WorkerLogsPolicy".to_string(),
            source: PolicySource::ManagedPolicy {
                logical_id: "WorkerLogsPolicy".to_string(),
            },
            reason: SkipReason::InternalServerError("InternalServerException".to_string()),
        });
        report
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(parse_log_level(None), LevelFilter::Error);
        assert_eq!(parse_log_level(Some("ERROR")), LevelFilter::Error);
        assert_eq!(parse_log_level(Some("WARNING")), LevelFilter::Warn);
        assert_eq!(parse_log_level(Some("warn")), LevelFilter::Warn);
        assert_eq!(parse_log_level(Some("Info")), LevelFilter::Info);
        assert_eq!(parse_log_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_log_level(Some("trace")), LevelFilter::Trace);
        assert_eq!(parse_log_level(Some("CRITICAL")), LevelFilter::Error);
        assert_eq!(parse_log_level(Some("FATAL")), LevelFilter::Error);
        assert_eq!(parse_log_level(Some("OFF")), LevelFilter::Off);
        assert_eq!(parse_log_level(Some("NOTSET")), LevelFilter::Trace);
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_error() {
        assert_eq!(parse_log_level(Some("verbose")), LevelFilter::Error);
        assert_eq!(parse_log_level(Some("")), LevelFilter::Error);
    }

    #[test]
    fn test_exit_status_fails_on_findings() {
        assert_eq!(exit_status(&report_with_finding(), false), 1);
        assert_eq!(exit_status(&report_with_finding(), true), 1);
    }

    #[test]
    fn test_exit_status_passes_when_all_findings_ignored() {
        let mut report = ValidationReport::default();
        report.results.insert("Suppressed", vec![]);
        assert_eq!(exit_status(&report, false), 0);
    }

    #[test]
    fn test_exit_status_for_skipped_policies() {
        assert_eq!(exit_status(&report_with_skip(), false), 0);
        assert_eq!(exit_status(&report_with_skip(), true), 1);
    }
}
