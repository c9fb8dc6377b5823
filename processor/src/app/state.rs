//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::access_token::{AccessTokenProvider, MetadataTokenProvider, StaticTokenProvider};
use crate::config::{Config, StoreBackend};
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::ProcessorError;
use crate::http::client::HttpClient;
use crate::http::infra_manager::{InfraManager, InfraManagerClient};
use crate::store::firestore::FirestoreStore;
use crate::store::memory::MemoryStore;
use crate::store::DocumentStore;

/// Main application state
pub struct AppState {
    pub config: Arc<Config>,

    /// Deployment lifecycle orchestrator
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Build the clients and the orchestrator from configuration
    pub fn init(config: Config, options: &AppOptions) -> Result<Self, ProcessorError> {
        info!("Initializing application state...");
        let config = Arc::new(config);

        let tokens: Arc<dyn AccessTokenProvider> = match &config.access_token {
            Some(token) => {
                info!("Using static access token from environment");
                Arc::new(StaticTokenProvider::new(token.clone()))
            }
            None => Arc::new(MetadataTokenProvider::new(&config.endpoints.metadata)?),
        };

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => {
                let http_client = Arc::new(HttpClient::with_quota_project(
                    &config.endpoints.firestore,
                    &config.project.id,
                )?);
                Arc::new(FirestoreStore::new(
                    http_client,
                    tokens.clone(),
                    &config.project.id,
                    &config.firestore,
                ))
            }
            StoreBackend::Memory => {
                info!("Using in-memory deployment store");
                Arc::new(MemoryStore::new())
            }
        };

        let infra_client = Arc::new(HttpClient::with_quota_project(
            &config.endpoints.infra_manager,
            &config.project.id,
        )?);
        let infra: Arc<dyn InfraManager> = Arc::new(InfraManagerClient::new(
            infra_client,
            tokens,
            config.project.id.clone(),
        ));

        let orchestrator = Arc::new(Orchestrator::new(
            config.clone(),
            store,
            infra,
            options.poll,
        ));

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) {
        info!("Shutting down application state...");
        self.orchestrator.shutdown().await;
    }
}
