//! Rendering of findings and persistence of the results mapping.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{CfnPolicyValidatorError, CfnPolicyValidatorResult};
use crate::types::{Finding, FindingLocation, RenderedFinding, ValidationResults};

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const RESULTS_FILE_NAME: &str = "results.json";

/// Render a finding the way it is printed and stored.
pub fn render_finding(finding: &Finding) -> RenderedFinding {
    RenderedFinding {
        finding_code: format!("{} ({})", finding.issue_code, finding.finding_type),
        finding_details: finding.finding_details.clone(),
        location: format_location(&finding.locations),
        learn_more_link: finding.learn_more_link.clone(),
    }
}

/// Location string from the first three path segments of the first location,
/// e.g. `Statement #0, Segment 'Resource'`.
pub fn format_location(locations: &[FindingLocation]) -> String {
    let Some(location) = locations.first() else {
        return "unknown".to_string();
    };
    match location.path.as_slice() {
        [] => "unknown".to_string(),
        [first] => first.to_string(),
        [first, second] => format!("{first} #{second}"),
        [first, second, third, ..] => format!("{first} #{second}, Segment '{third}'"),
    }
}

/// Serialize with four-space indentation.
pub fn to_pretty_json<T>(value: &T) -> CfnPolicyValidatorResult<String>
where
    T: ?Sized + Serialize,
{
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| CfnPolicyValidatorError::parsing(e.to_string()))
}

/// Write `results.json` into `output_dir`, creating the directory if needed.
pub async fn write_results_file(
    results: &ValidationResults,
    output_dir: impl AsRef<Path>,
) -> CfnPolicyValidatorResult<PathBuf> {
    let output_dir = output_dir.as_ref();
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| CfnPolicyValidatorError::file_system("create directory", output_dir, e))?;

    let path = output_dir.join(RESULTS_FILE_NAME);
    let content = to_pretty_json(results)?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| CfnPolicyValidatorError::file_system("write", &path, e))?;
    Ok(path)
}
