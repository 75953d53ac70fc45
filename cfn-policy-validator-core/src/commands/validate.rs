//! End-to-end validation of one template

use log::{debug, info};
use std::path::Path;

use crate::error::CfnPolicyValidatorResult;
use crate::substitution::{resolve_substitutions, SubstitutionContext};
use crate::template::{extract_policies, Template};
use crate::types::{PolicyRecord, ValidationReport};
use crate::validation::{PolicyValidator, RetryPolicy};

/// Per-run validation settings.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Finding types left out of the results (e.g. `SUGGESTION`).
    pub ignored_finding_types: Vec<String>,
    pub retry_policy: RetryPolicy,
}

impl super::service::CfnPolicyValidatorService {
    /// Load, extract, resolve and validate the template at `path`.
    ///
    /// `on_policy` is called right before each policy is submitted.
    pub async fn validate_template<F>(
        &self,
        path: &Path,
        account_id: &str,
        options: &ValidateOptions,
        on_policy: F,
    ) -> CfnPolicyValidatorResult<ValidationReport>
    where
        F: FnMut(&PolicyRecord),
    {
        let template = Template::load(path).await?;
        let records = extract_policies(&template)?;
        info!(
            "Found {} policy documents in {}",
            records.len(),
            path.display()
        );

        let context = SubstitutionContext::new(account_id, self.region.as_str());
        let records = resolve_substitutions(records, &context);

        debug!("Validating Policies...");
        let validator = PolicyValidator::new(
            self.analyzer.as_ref(),
            options.ignored_finding_types.iter().cloned(),
        )
        .with_retry_policy(options.retry_policy.clone());

        Ok(validator.validate_all(&records, on_policy).await)
    }
}
