//! Error types for the sandbox processor

use thiserror::Error;

use crate::models::deployment::DeploymentStatus;

/// Main error type for the processor
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success response from a Google API
    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Invalid deployment status: expected {expected}, found {found}")]
    InvalidStatus {
        expected: DeploymentStatus,
        found: String,
    },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessorError {
    /// True for a missing document or a 404 from a Google API
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProcessorError::ApiError { status: 404, .. } | ProcessorError::NotFound(_)
        )
    }
}
