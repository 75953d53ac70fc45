//! Collects IAM policy documents from a template's resources.

use log::{debug, trace};
use serde_json::Value;

use crate::error::{CfnPolicyValidatorError, CfnPolicyValidatorResult};
use crate::template::Template;
use crate::types::{PolicyRecord, PolicySource};

pub const MANAGED_POLICY_TYPE: &str = "AWS::IAM::ManagedPolicy";
pub const ROLE_TYPE: &str = "AWS::IAM::Role";

/// Extract every managed policy and role inline policy, in that order.
///
/// Within each group records follow the template's resource order. A managed
/// policy is named after its logical resource id, an inline policy after its
/// `PolicyName`.
pub fn extract_policies(template: &Template) -> CfnPolicyValidatorResult<Vec<PolicyRecord>> {
    let resources = template.resources();
    let mut records = Vec::new();

    for (logical_id, resource) in resources {
        if resource_type(resource) != Some(MANAGED_POLICY_TYPE) {
            continue;
        }
        let document = resource
            .get("Properties")
            .and_then(|properties| properties.get("PolicyDocument"))
            .ok_or_else(|| {
                CfnPolicyValidatorError::invalid_template(format!(
                    "managed policy '{logical_id}' has no PolicyDocument"
                ))
            })?;
        trace!("Found managed policy {}", logical_id);
        records.push(PolicyRecord {
            policy_name: logical_id.clone(),
            policy_document: document.clone(),
            source: PolicySource::ManagedPolicy {
                logical_id: logical_id.clone(),
            },
        });
    }

    for (logical_id, resource) in resources {
        if resource_type(resource) != Some(ROLE_TYPE) {
            continue;
        }
        // Roles with only managed policies attached have no Policies list
        let policies = match resource
            .get("Properties")
            .and_then(|properties| properties.get("Policies"))
        {
            Some(Value::Array(policies)) => policies,
            Some(Value::Null) | None => {
                debug!("Role {} has no inline policies", logical_id);
                continue;
            }
            Some(_) => {
                return Err(CfnPolicyValidatorError::invalid_template(format!(
                    "role '{logical_id}' Policies must be a list"
                )))
            }
        };

        for policy in policies {
            let name = policy
                .get("PolicyName")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CfnPolicyValidatorError::invalid_template(format!(
                        "inline policy of role '{logical_id}' has no string PolicyName"
                    ))
                })?;
            let document = policy.get("PolicyDocument").ok_or_else(|| {
                CfnPolicyValidatorError::invalid_template(format!(
                    "inline policy '{name}' of role '{logical_id}' has no PolicyDocument"
                ))
            })?;
            trace!("Found inline policy {} on role {}", name, logical_id);
            records.push(PolicyRecord {
                policy_name: name.to_string(),
                policy_document: document.clone(),
                source: PolicySource::RoleInlinePolicy {
                    role_logical_id: logical_id.clone(),
                },
            });
        }
    }

    debug!("Extracted {} policy documents", records.len());
    Ok(records)
}

fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("Type").and_then(Value::as_str)
}
