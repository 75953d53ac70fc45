//! Core data types shared by extraction, substitution and validation.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Where a policy document was found in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// An `AWS::IAM::ManagedPolicy` resource, by logical id.
    ManagedPolicy { logical_id: String },
    /// An entry of an `AWS::IAM::Role`'s `Policies` list, by the role's logical id.
    RoleInlinePolicy { role_logical_id: String },
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedPolicy { logical_id } => write!(f, "managed policy {logical_id}"),
            Self::RoleInlinePolicy { role_logical_id } => {
                write!(f, "inline policy of role {role_logical_id}")
            }
        }
    }
}

/// A single policy document pulled out of a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyRecord {
    pub policy_name: String,
    pub policy_document: Value,
    #[serde(skip)]
    pub source: PolicySource,
}

/// One element of a finding location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(i32),
    Key(String),
    Value(String),
    Substring { start: i32, length: i32 },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Key(key) => write!(f, "{key}"),
            Self::Value(value) => write!(f, "{value}"),
            Self::Substring { start, length } => write!(f, "{start}+{length}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingLocation {
    pub path: Vec<PathSegment>,
}

/// A finding returned by the policy analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// `ERROR`, `SECURITY_WARNING`, `SUGGESTION` or `WARNING`.
    pub finding_type: String,
    pub issue_code: String,
    pub finding_details: String,
    pub locations: Vec<FindingLocation>,
    pub learn_more_link: String,
}

/// Finding as it is printed and written to the results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedFinding {
    #[serde(rename = "Finding Code")]
    pub finding_code: String,
    #[serde(rename = "Finding Details")]
    pub finding_details: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Learn more link")]
    pub learn_more_link: String,
}

/// Ordered mapping of policy name to its non-ignored findings.
///
/// A policy appears only when the service returned at least one finding for
/// it. An empty list means every finding was ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResults {
    entries: Vec<(String, Vec<RenderedFinding>)>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the findings of a policy, keeping first-insertion order.
    pub fn insert(&mut self, policy_name: impl Into<String>, findings: Vec<RenderedFinding>) {
        let policy_name = policy_name.into();
        match self.entries.iter_mut().find(|(name, _)| *name == policy_name) {
            Some((_, existing)) => *existing = findings,
            None => self.entries.push((policy_name, findings)),
        }
    }

    pub fn get(&self, policy_name: &str) -> Option<&[RenderedFinding]> {
        self.entries
            .iter()
            .find(|(name, _)| name == policy_name)
            .map(|(_, findings)| findings.as_slice())
    }

    pub fn contains(&self, policy_name: &str) -> bool {
        self.get(policy_name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RenderedFinding])> {
        self.entries
            .iter()
            .map(|(name, findings)| (name.as_str(), findings.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ValidationResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, findings) in &self.entries {
            map.serialize_entry(name, findings)?;
        }
        map.end()
    }
}

/// Why a policy could not be validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The service kept answering with an internal server error.
    InternalServerError(String),
    /// Any other failure, including exhausted retries.
    RequestFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InternalServerError(detail) => write!(f, "internal server error: {detail}"),
            Self::RequestFailed(detail) => write!(f, "validation request failed: {detail}"),
        }
    }
}

/// Outcome of validating a single policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Validated(Vec<Finding>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPolicy {
    pub policy_name: String,
    pub source: PolicySource,
    pub reason: SkipReason,
}

/// Everything a validation run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub results: ValidationResults,
    pub skipped: Vec<SkippedPolicy>,
}

impl ValidationReport {
    /// Policies that still have findings after ignore filtering.
    pub fn failing_policies(&self) -> impl Iterator<Item = (&str, &[RenderedFinding])> {
        self.results
            .iter()
            .filter(|(_, findings)| !findings.is_empty())
    }

    /// True when no policy has a remaining finding. Skipped policies do not count.
    pub fn passed(&self) -> bool {
        self.failing_policies().next().is_none()
    }

    /// The pass/fail decision of a run. With `fail_on_skipped`, a policy that
    /// could not be validated fails the run as well.
    pub fn gate_passed(&self, fail_on_skipped: bool) -> bool {
        self.passed() && !(fail_on_skipped && !self.skipped.is_empty())
    }
}
