//! Infrastructure Manager API client

use std::sync::Arc;

use async_trait::async_trait;
use openapi_client::models::{CreateDeploymentRequest, Operation};
use tracing::info;

use crate::authn::access_token::AccessTokenProvider;
use crate::errors::ProcessorError;
use crate::http::client::HttpClient;

/// Provisioning API seam; the orchestrator only talks to this trait
#[async_trait]
pub trait InfraManager: Send + Sync {
    /// Submit a blueprint; returns the long-running operation
    async fn create_deployment(
        &self,
        region: &str,
        deployment_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Operation, ProcessorError>;

    /// Force-delete a deployment and the resources it created
    async fn delete_deployment(
        &self,
        region: &str,
        deployment_id: &str,
    ) -> Result<Operation, ProcessorError>;

    /// Fetch the current state of an operation by its full name
    async fn get_operation(&self, operation_name: &str) -> Result<Operation, ProcessorError>;
}

/// REST implementation against `config.googleapis.com/v1`
pub struct InfraManagerClient {
    http_client: Arc<HttpClient>,
    tokens: Arc<dyn AccessTokenProvider>,
    project_id: String,
}

impl InfraManagerClient {
    pub fn new(
        http_client: Arc<HttpClient>,
        tokens: Arc<dyn AccessTokenProvider>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            tokens,
            project_id: project_id.into(),
        }
    }

    fn deployments_path(&self, region: &str) -> String {
        format!(
            "projects/{}/locations/{}/deployments",
            self.project_id, region
        )
    }
}

#[async_trait]
impl InfraManager for InfraManagerClient {
    async fn create_deployment(
        &self,
        region: &str,
        deployment_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Operation, ProcessorError> {
        let token = self.tokens.access_token().await?;
        let path = self.deployments_path(region);

        info!(
            deployment_id,
            gcs_source = %request.terraform_blueprint.gcs_source,
            "Submitting deployment to Infrastructure Manager"
        );

        self.http_client
            .post(&path, &token, &[("deploymentId", deployment_id)], request)
            .await
    }

    async fn delete_deployment(
        &self,
        region: &str,
        deployment_id: &str,
    ) -> Result<Operation, ProcessorError> {
        let token = self.tokens.access_token().await?;
        let path = format!("{}/{}", self.deployments_path(region), deployment_id);

        info!(deployment_id, force = true, "Submitting deletion to Infrastructure Manager");

        self.http_client
            .delete(&path, &token, &[("force", "true")])
            .await
    }

    async fn get_operation(&self, operation_name: &str) -> Result<Operation, ProcessorError> {
        let token = self.tokens.access_token().await?;
        self.http_client.get(operation_name, &token).await
    }
}
