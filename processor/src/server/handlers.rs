//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::models::{
    CreateRequest, DeleteRequest, ErrorResponse, HealthResponse, ProcessResponse, VersionResponse,
};
use tracing::{error, warn};

use crate::deploy::orchestrator::DeletionTarget;
use crate::deploy::payload::BlueprintTarget;
use crate::errors::ProcessorError;
use crate::server::state::ServerState;
use crate::utils::version_info;

pub const SERVICE_NAME: &str = "infra-manager-processor";

/// Error surfaced to HTTP callers
#[derive(Debug)]
pub struct ApiError(ProcessorError);

impl From<ProcessorError> for ApiError {
    fn from(err: ProcessorError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ProcessorError::ValidationError(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ProcessorError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg.clone(),
                    message: None,
                },
            ),
            // a Google API 404 is an upstream failure, not a missing record
            ProcessorError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Deployment document not found".to_string(),
                    message: None,
                },
            ),
            ProcessorError::InvalidStatus { expected, found } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid deployment status".to_string(),
                    message: Some(format!(
                        "Deployment must be in \"{}\" status to proceed (found \"{}\")",
                        expected, found
                    )),
                },
            ),
            ProcessorError::ShutdownError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "Service shutting down".to_string(),
                    message: Some(msg.clone()),
                },
            ),
            err => {
                error!("Failed to process request: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Failed to process request".to_string(),
                        message: Some(err.to_string()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: version_info().version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// `POST /create`: validate, mark pending and hand off to the background
pub async fn create_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let Json(request) = body?;

    let document_id = require(request.document_id, "Missing documentId in request")?;
    let data = request.data.unwrap_or_default();
    let (template_type, region) = match (non_empty(data.template_type), non_empty(data.region)) {
        (Some(template_type), Some(region)) => (template_type, region),
        _ => {
            warn!(document_id = %document_id, "Create request missing type or region");
            return Err(missing_data());
        }
    };

    state
        .orchestrator
        .accept_create(BlueprintTarget {
            document_id: document_id.clone(),
            template_type,
            region,
        })
        .await?;

    Ok(Json(ProcessResponse {
        status: "success".to_string(),
        document_id,
        message: Some("Deployment initiated".to_string()),
        operation_name: None,
    }))
}

/// `POST /delete`: validate, submit the deletion and poll in the background
pub async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let Json(request) = body?;

    let document_id = require(request.document_id, "Missing documentId in request")?;
    let data = request.data.unwrap_or_default();
    let (deployment_id, region) =
        match (non_empty(data.infra_manager_deployment_id), non_empty(data.region)) {
            (Some(deployment_id), Some(region)) => (deployment_id, region),
            _ => {
                warn!(document_id = %document_id, "Delete request missing deployment id or region");
                return Err(missing_data());
            }
        };

    let operation = state
        .orchestrator
        .accept_delete(DeletionTarget {
            document_id: document_id.clone(),
            deployment_id,
            region,
        })
        .await?;

    Ok(Json(ProcessResponse {
        status: "success".to_string(),
        document_id,
        message: Some("Deletion initiated".to_string()),
        operation_name: Some(operation.name),
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(value: Option<String>, message: &str) -> Result<String, ApiError> {
    non_empty(value).ok_or_else(|| ApiError(ProcessorError::ValidationError(message.to_string())))
}

fn missing_data() -> ApiError {
    ApiError(ProcessorError::ValidationError(
        "Missing required data fields".to_string(),
    ))
}
