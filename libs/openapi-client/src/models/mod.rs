//! Infrastructure Manager (config.googleapis.com/v1) models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Deployment creation request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub terraform_blueprint: TerraformBlueprint,
    pub service_account: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Terraform blueprint stored in Cloud Storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformBlueprint {
    /// `gs://` URI of the blueprint directory
    pub gcs_source: String,

    /// Terraform input variables
    #[serde(default)]
    pub input_values: BTreeMap<String, TerraformVariable>,
}

/// A single Terraform input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformVariable {
    pub input_value: String,
}

impl TerraformVariable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            input_value: value.into(),
        }
    }
}

/// Long-running operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation resource name, e.g. `projects/p/locations/r/operations/operation-123`
    pub name: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    /// Last path segment of the operation name
    pub fn short_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// `google.rpc.Status` carried by a failed operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}
