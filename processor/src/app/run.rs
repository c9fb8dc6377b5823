//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::config::Config;
use crate::errors::ProcessorError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the processor until the shutdown signal resolves
pub async fn run(
    config: Config,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ProcessorError> {
    info!("Initializing infra-manager processor...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let app_state = match init(config, &options, &shutdown_tx, &mut shutdown_manager).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to start processor: {}", e);
            shutdown_manager.shutdown().await?;
            return Err(e);
        }
    };

    info!(
        project = %app_state.config.project.id,
        environment = %app_state.config.environment,
        service_url = %app_state.config.service.url,
        "Processor ready"
    );

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    // Shutdown
    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    config: Config,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, ProcessorError> {
    let app_state = Arc::new(AppState::init(config, options)?);
    shutdown_manager.with_app_state(app_state.clone())?;

    init_server(options, app_state.clone(), shutdown_manager, shutdown_tx.subscribe()).await?;

    Ok(app_state)
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ProcessorError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(app_state.orchestrator.clone());

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), ProcessorError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
        }
    }

    pub fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), ProcessorError> {
        if self.app_state.is_some() {
            return Err(ProcessorError::ShutdownError("app_state already set".to_string()));
        }
        self.app_state = Some(state);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), ProcessorError>>,
    ) -> Result<(), ProcessorError> {
        if self.server_handle.is_some() {
            return Err(ProcessorError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ProcessorError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ProcessorError> {
        info!("Shutting down infra-manager processor...");

        // 1. HTTP server stops accepting and drains in-flight requests
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| ProcessorError::ShutdownError(e.to_string()))??;
        }

        // 2. Background pollers
        if let Some(app_state) = self.app_state.take() {
            app_state.shutdown().await;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
