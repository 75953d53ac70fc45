//! CloudFormation template loading and IAM policy extraction.

pub mod extractor;
mod yaml;

use log::debug;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{CfnPolicyValidatorError, CfnPolicyValidatorResult};

pub use extractor::extract_policies;

/// Serialization format of a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl TemplateFormat {
    /// Detect the format from the file extension. Anything that is not
    /// `.yaml` or `.yml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A parsed CloudFormation template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    resources: Map<String, Value>,
}

impl Template {
    /// Read and parse the template at `path`.
    pub async fn load(path: impl AsRef<Path>) -> CfnPolicyValidatorResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CfnPolicyValidatorError::TemplateNotFound(path.to_path_buf())
            } else {
                CfnPolicyValidatorError::file_system("read", path, e)
            }
        })?;

        Self::parse(&content, TemplateFormat::from_path(path))
    }

    /// Parse template text. Fails if the document has no `Resources` mapping.
    pub fn parse(content: &str, format: TemplateFormat) -> CfnPolicyValidatorResult<Self> {
        let body = match format {
            TemplateFormat::Yaml => {
                debug!("YAML/YML CloudFormation template detected");
                yaml::to_json(content)?
            }
            TemplateFormat::Json => {
                debug!("JSON CloudFormation template detected");
                serde_json::from_str(content)
                    .map_err(|e| CfnPolicyValidatorError::parsing(e.to_string()))?
            }
        };

        let Value::Object(mut root) = body else {
            return Err(CfnPolicyValidatorError::parsing(
                "template root must be a mapping",
            ));
        };

        match root.remove("Resources") {
            Some(Value::Object(resources)) => Ok(Self { resources }),
            Some(_) => Err(CfnPolicyValidatorError::parsing(
                "'Resources' must be a mapping",
            )),
            None => Err(CfnPolicyValidatorError::parsing(
                "template has no 'Resources' section",
            )),
        }
    }

    /// The `Resources` mapping, in document order.
    pub fn resources(&self) -> &Map<String, Value> {
        &self.resources
    }
}
