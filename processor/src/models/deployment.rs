//! Deployment record models

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProcessorError;

/// Tag written to `_updateSource` on every processor write. The document
/// triggers skip records whose last writer carries this tag.
pub const UPDATE_SOURCE: &str = "cloudrun";

/// Lifecycle status of a deployment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentStatus {
    #[serde(rename = "provision_requested")]
    ProvisionRequested,
    #[serde(rename = "provision_pending")]
    ProvisionPending,
    #[serde(rename = "provision_inprogress")]
    ProvisionInProgress,
    #[serde(rename = "provision_successful")]
    ProvisionSuccessful,
    #[serde(rename = "provision_error")]
    ProvisionError,
    #[serde(rename = "delete_requested")]
    DeleteRequested,
    #[serde(rename = "delete_pending")]
    DeletePending,
    #[serde(rename = "delete_inprogress")]
    DeleteInProgress,
    #[serde(rename = "delete_error")]
    DeleteError,

    /// Any status string this service does not own
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::ProvisionRequested => "provision_requested",
            DeploymentStatus::ProvisionPending => "provision_pending",
            DeploymentStatus::ProvisionInProgress => "provision_inprogress",
            DeploymentStatus::ProvisionSuccessful => "provision_successful",
            DeploymentStatus::ProvisionError => "provision_error",
            DeploymentStatus::DeleteRequested => "delete_requested",
            DeploymentStatus::DeletePending => "delete_pending",
            DeploymentStatus::DeleteInProgress => "delete_inprogress",
            DeploymentStatus::DeleteError => "delete_error",
            DeploymentStatus::Unknown => "unknown",
        }
    }

    /// No further transition leaves this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::ProvisionSuccessful
                | DeploymentStatus::ProvisionError
                | DeploymentStatus::DeleteError
        )
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment document as read from the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default)]
    pub status: Option<DeploymentStatus>,

    #[serde(default)]
    pub operation_name: Option<String>,

    #[serde(default)]
    pub infra_manager_deployment_id: Option<String>,

    #[serde(default)]
    pub template_name: Option<String>,

    /// Terraform input variables requested by the user
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: BTreeMap<String, Value>,

    #[serde(default)]
    pub error: Option<Value>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, rename = "_updateSource")]
    pub update_source: Option<String>,

    /// Fields owned by other writers, kept as-is. Timestamps land here too:
    /// other writers store them in formats this service never parses.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeploymentRecord {
    /// Parse a record from raw document fields
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, ProcessorError> {
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Status as a display string, `"<none>"` when the field is absent
    pub fn status_label(&self) -> String {
        self.status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}

/// Explicit `null` reads as the empty value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A partial write to a deployment record. Only the set fields are written;
/// `updatedAt` and `_updateSource` are always included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeploymentStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_manager_deployment_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_manager_result: Option<Value>,

    /// `"n/N"` of the most recent status check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<String>,

    pub updated_at: DateTime<Utc>,

    #[serde(rename = "_updateSource")]
    pub update_source: String,
}

impl DeploymentUpdate {
    pub fn new() -> Self {
        Self {
            status: None,
            operation_name: None,
            infra_manager_deployment_id: None,
            error: None,
            message: None,
            console_url: None,
            infra_manager_result: None,
            attempt: None,
            updated_at: Utc::now(),
            update_source: UPDATE_SOURCE.to_string(),
        }
    }

    pub fn status(mut self, status: DeploymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn deployment_id(mut self, id: impl Into<String>) -> Self {
        self.infra_manager_deployment_id = Some(id.into());
        self
    }

    pub fn error(mut self, error: impl Into<Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn console_url(mut self, url: impl Into<String>) -> Self {
        self.console_url = Some(url.into());
        self
    }

    pub fn result(mut self, result: Value) -> Self {
        self.infra_manager_result = Some(result);
        self
    }

    pub fn attempt(mut self, attempt: u32, max_attempts: u32) -> Self {
        self.attempt = Some(format!("{}/{}", attempt, max_attempts));
        self
    }

    /// Document fields this update writes, keyed by field name
    pub fn to_fields(&self) -> Result<Map<String, Value>, ProcessorError> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(ProcessorError::Internal(format!(
                "deployment update serialized to non-object: {}",
                other
            ))),
        }
    }
}

impl Default for DeploymentUpdate {
    fn default() -> Self {
        Self::new()
    }
}
