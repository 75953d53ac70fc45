//! `Fn::Sub` resolution for the account id and region pseudo parameters.
//!
//! Only `${AWS::AccountId}` and `${AWS::Region}` inside a plain-string
//! `Fn::Sub` are resolved, and only in a statement's `Resource` and
//! `Condition`. Every other intrinsic (`Ref`, `Fn::Join`, the two-element
//! `Fn::Sub` form, parameters) reaches the analyzer verbatim.

use log::{debug, info};
use serde_json::Value;

use crate::types::PolicyRecord;

pub const SUB_INTRINSIC: &str = "Fn::Sub";
pub const ACCOUNT_ID_TOKEN: &str = "${AWS::AccountId}";
pub const REGION_TOKEN: &str = "${AWS::Region}";

/// Values substituted for the pseudo parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionContext {
    pub account_id: String,
    pub region: String,
}

impl SubstitutionContext {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    fn substitute(&self, template: &str) -> String {
        template
            .replace(ACCOUNT_ID_TOKEN, &self.account_id)
            .replace(REGION_TOKEN, &self.region)
    }
}

/// Resolve substitutions in every record's statements, in place.
pub fn resolve_substitutions(
    mut records: Vec<PolicyRecord>,
    context: &SubstitutionContext,
) -> Vec<PolicyRecord> {
    for record in &mut records {
        match record.policy_document.get_mut("Statement") {
            Some(Value::Array(statements)) => {
                for statement in statements {
                    resolve_statement(statement, context);
                }
            }
            Some(statement) if statement.is_object() => resolve_statement(statement, context),
            _ => debug!("Policy {} has no statements to resolve", record.policy_name),
        }
    }
    records
}

fn resolve_statement(statement: &mut Value, context: &SubstitutionContext) {
    if let Some(resource) = statement.get_mut("Resource") {
        match resource {
            Value::Array(items) => substitute_elements(items, context),
            other => {
                if let Some(template) = sub_template(other) {
                    let resolved = context.substitute(template);
                    *other = Value::String(resolved);
                }
            }
        }
    }

    if let Some(condition) = statement.get_mut("Condition") {
        resolve_condition(condition, context);
    }
}

fn resolve_condition(condition: &mut Value, context: &SubstitutionContext) {
    let Value::Object(blocks) = condition else {
        info!("Condition is not a mapping and does not require parsing");
        return;
    };

    for (operator, block) in blocks.iter_mut() {
        let Value::Object(entries) = block else {
            info!("Condition block {} does not require parsing", operator);
            continue;
        };
        for (key, value) in entries.iter_mut() {
            match value {
                Value::Array(items) => substitute_elements(items, context),
                Value::Object(_) => {
                    // Mapping-valued entries keep their Fn::Sub form; only list
                    // entries are rewritten.
                    if let Some(template) = sub_template(value) {
                        let unapplied = context.substitute(template);
                        debug!(
                            "Condition {}/{} left unresolved (would be '{}')",
                            operator, key, unapplied
                        );
                    }
                }
                _ => info!("Condition {}/{} does not require parsing", operator, key),
            }
        }
    }
}

fn substitute_elements(items: &mut [Value], context: &SubstitutionContext) {
    for item in items {
        if let Some(template) = sub_template(item) {
            let resolved = context.substitute(template);
            *item = Value::String(resolved);
        }
    }
}

/// The string argument of a `{"Fn::Sub": "<string>"}` mapping.
fn sub_template(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(SUB_INTRINSIC).and_then(Value::as_str),
        _ => None,
    }
}
