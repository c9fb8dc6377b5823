//! Processor API models

use serde::{Deserialize, Serialize};

/// `POST /create` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub data: Option<CreateRequestData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequestData {
    /// Deployment name
    #[serde(default)]
    pub name: Option<String>,

    /// Deployment region
    #[serde(default)]
    pub region: Option<String>,

    /// Template type, e.g. `basic-vm` or `empty-project`
    #[serde(default, rename = "type")]
    pub template_type: Option<String>,
}

/// `POST /delete` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub data: Option<DeleteRequestData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequestData {
    #[serde(default)]
    pub infra_manager_deployment_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Success response for `/create` and `/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub status: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}
