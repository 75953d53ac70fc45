//! YAML to JSON conversion for CloudFormation templates.
//!
//! CloudFormation YAML allows short-form intrinsic tags (`!Sub`, `!Ref`,
//! `!GetAtt`, ...). They are rewritten into the long JSON form so the rest of
//! the pipeline only ever sees `{"Fn::Sub": ...}` style mappings.

use serde_json::{Map, Number, Value};
use serde_yaml::value::TaggedValue;
use serde_yaml::Value as YamlValue;

use crate::error::{CfnPolicyValidatorError, CfnPolicyValidatorResult};

pub(crate) fn to_json(content: &str) -> CfnPolicyValidatorResult<Value> {
    let document: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| CfnPolicyValidatorError::parsing(e.to_string()))?;
    convert(document)
}

fn convert(value: YamlValue) -> CfnPolicyValidatorResult<Value> {
    match value {
        YamlValue::Null => Ok(Value::Null),
        YamlValue::Bool(b) => Ok(Value::Bool(b)),
        YamlValue::Number(n) => convert_number(&n),
        YamlValue::String(s) => Ok(Value::String(s)),
        YamlValue::Sequence(items) => items
            .into_iter()
            .map(convert)
            .collect::<CfnPolicyValidatorResult<Vec<_>>>()
            .map(Value::Array),
        YamlValue::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(mapping_key(key)?, convert(value)?);
            }
            Ok(Value::Object(object))
        }
        YamlValue::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            let tag = tag.to_string();
            Ok(intrinsic(tag.trim_start_matches('!'), convert(value)?))
        }
    }
}

/// Long form of a short-form intrinsic tag.
fn intrinsic(name: &str, value: Value) -> Value {
    let (key, value) = match name {
        "Ref" | "Condition" => (name.to_string(), value),
        "GetAtt" => {
            let value = match value {
                Value::String(s) => match s.split_once('.') {
                    Some((resource, attribute)) => Value::Array(vec![
                        Value::String(resource.to_string()),
                        Value::String(attribute.to_string()),
                    ]),
                    None => Value::String(s),
                },
                other => other,
            };
            ("Fn::GetAtt".to_string(), value)
        }
        other => (format!("Fn::{other}"), value),
    };

    let mut object = Map::with_capacity(1);
    object.insert(key, value);
    Value::Object(object)
}

fn convert_number(number: &serde_yaml::Number) -> CfnPolicyValidatorResult<Value> {
    if let Some(i) = number.as_i64() {
        Ok(Value::from(i))
    } else if let Some(u) = number.as_u64() {
        Ok(Value::from(u))
    } else {
        number
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                CfnPolicyValidatorError::parsing(format!(
                    "number {number} cannot be represented in JSON"
                ))
            })
    }
}

fn mapping_key(key: YamlValue) -> CfnPolicyValidatorResult<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        other => Err(CfnPolicyValidatorError::parsing(format!(
            "unsupported mapping key: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_structures() {
        let value = to_json(
            r#"
Version: "2012-10-17"
Count: 3
Enabled: true
Nothing: ~
Items:
  - one
  - 2.5
"#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Count": 3,
                "Enabled": true,
                "Nothing": null,
                "Items": ["one", 2.5]
            })
        );
    }

    #[test]
    fn test_short_form_intrinsics() {
        let value = to_json(
            r#"
Sub: !Sub "arn:aws:s3:::${AWS::AccountId}-logs"
Ref: !Ref BucketName
GetAtt: !GetAtt Role.Arn
Join: !Join ["", ["a", "b"]]
Cond: !Condition IsProd
"#,
        )
        .unwrap();
        assert_eq!(value["Sub"], json!({"Fn::Sub": "arn:aws:s3:::${AWS::AccountId}-logs"}));
        assert_eq!(value["Ref"], json!({"Ref": "BucketName"}));
        assert_eq!(value["GetAtt"], json!({"Fn::GetAtt": ["Role", "Arn"]}));
        assert_eq!(value["Join"], json!({"Fn::Join": ["", ["a", "b"]]}));
        assert_eq!(value["Cond"], json!({"Condition": "IsProd"}));
    }

    #[test]
    fn test_nested_intrinsics() {
        let value = to_json("Value: !Sub [\"${Name}-x\", {Name: !Ref Thing}]\n").unwrap();
        assert_eq!(
            value["Value"],
            json!({"Fn::Sub": ["${Name}-x", {"Name": {"Ref": "Thing"}}]})
        );
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let value = to_json("1: one\ntrue: yes\n").unwrap();
        assert_eq!(value, json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = to_json("Resources: [unclosed").unwrap_err();
        assert!(matches!(err, CfnPolicyValidatorError::Parsing(_)));
    }
}
