//! Create and delete flows for deployment records

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use openapi_client::models::Operation;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::deploy::fsm::{StatusEvent, StatusMachine, Transition};
use crate::deploy::payload::{build_create_request, BlueprintTarget};
use crate::deploy::poller::{OperationPoller, PollCheck, PollOptions};
use crate::errors::ProcessorError;
use crate::http::infra_manager::InfraManager;
use crate::models::deployment::{DeploymentRecord, DeploymentStatus, DeploymentUpdate};
use crate::store::DocumentStore;
use crate::utils::generate_deployment_id;

pub const PREPARING_MESSAGE: &str = "Preparing deployment request";
pub const SUBMITTING_MESSAGE: &str = "Submitting deployment to Infrastructure Manager";
pub const SUBMITTED_MESSAGE: &str = "Deployment submitted successfully, starting status checks";
pub const BACKGROUND_MESSAGE: &str =
    "Deployment continuing in background. Check console for latest status.";
pub const DELETE_TIMEOUT_MESSAGE: &str =
    "Deletion status check timed out, but deletion may still be in progress";

type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Deployment to remove, as named by the delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionTarget {
    pub document_id: String,
    pub deployment_id: String,
    pub region: String,
}

/// Validates requests against stored records, talks to Infrastructure
/// Manager and tracks the resulting operations in background tasks
pub struct Orchestrator {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    infra: Arc<dyn InfraManager>,
    poll: PollOptions,
    shutdown_tx: broadcast::Sender<()>,
    closing: AtomicBool,
    tasks: Mutex<JoinSet<()>>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        infra: Arc<dyn InfraManager>,
        poll: PollOptions,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            store,
            infra,
            poll,
            shutdown_tx,
            closing: AtomicBool::new(false),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Accept a create request. The record moves to `provision_pending`
    /// before this returns; submission and polling continue in the
    /// background.
    pub async fn accept_create(self: &Arc<Self>, target: BlueprintTarget) -> Result<(), ProcessorError> {
        let document_id = target.document_id.clone();
        let record = self
            .load_record(&document_id, DeploymentStatus::ProvisionRequested)
            .await?;
        let shutdown_signal = self.shutdown_signal()?;

        let mut machine = StatusMachine::new(DeploymentStatus::ProvisionRequested);
        let status = next_status(&mut machine, StatusEvent::ProvisionAccepted)?;
        self.store
            .update(
                &document_id,
                &DeploymentUpdate::new().status(status).message(PREPARING_MESSAGE),
            )
            .await?;

        info!(
            document_id = %document_id,
            template_type = %target.template_type,
            region = %target.region,
            "Deployment accepted"
        );

        let this = Arc::clone(self);
        let span = info_span!("provision", document_id = %document_id);
        self.spawn_task(
            async move {
                this.provision(target, record, machine, shutdown_signal).await;
            }
            .instrument(span),
        );
        Ok(())
    }

    /// Accept a delete request. The deletion is submitted before this
    /// returns; polling continues in the background.
    pub async fn accept_delete(
        self: &Arc<Self>,
        target: DeletionTarget,
    ) -> Result<Operation, ProcessorError> {
        let document_id = target.document_id.clone();
        self.load_record(&document_id, DeploymentStatus::DeleteRequested)
            .await?;
        let shutdown_signal = self.shutdown_signal()?;

        let mut machine = StatusMachine::new(DeploymentStatus::DeleteRequested);
        let operation = match self
            .infra
            .delete_deployment(&target.region, &target.deployment_id)
            .await
        {
            Ok(operation) => operation,
            Err(e) => {
                error!(
                    document_id = %document_id,
                    deployment_id = %target.deployment_id,
                    "Error deleting deployment: {}",
                    e
                );
                let status = next_status(&mut machine, StatusEvent::DeleteFailed(e.to_string()))?;
                let update = DeploymentUpdate::new()
                    .status(status)
                    .error(e.to_string())
                    .message(format!("Deletion request failed: {}", e));
                if let Err(write_err) = self.store.update(&document_id, &update).await {
                    error!(document_id = %document_id, "Failed to record deletion error: {}", write_err);
                }
                return Err(e);
            }
        };

        let status = next_status(&mut machine, StatusEvent::DeleteAccepted)?;
        self.store
            .update(
                &document_id,
                &DeploymentUpdate::new()
                    .status(status)
                    .operation_name(operation.name.clone()),
            )
            .await?;

        info!(
            document_id = %document_id,
            deployment_id = %target.deployment_id,
            operation_id = operation.short_id(),
            operation = %operation.name,
            console_url = %self.config.console_url(&target.region, &target.deployment_id),
            "Deletion initiated"
        );

        let this = Arc::clone(self);
        let operation_name = operation.name.clone();
        let span = info_span!("delete", document_id = %document_id);
        self.spawn_task(
            async move {
                this.track_deletion(&document_id, &operation_name, machine, shutdown_signal)
                    .await;
            }
            .instrument(span),
        );
        Ok(operation)
    }

    /// Wait until every background task has finished
    pub async fn wait_for_tasks(&self) {
        loop {
            let mut tasks = match self.tasks.lock() {
                Ok(mut guard) => std::mem::take(&mut *guard),
                Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
            };
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!("Background task failed: {}", e);
                }
            }
        }
    }

    /// Refuse new work, stop pollers at their next wait and drain tasks
    pub async fn shutdown(&self) {
        info!("Stopping background deployment tasks...");
        self.closing.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
        self.wait_for_tasks().await;
    }

    // =============================== PROVISIONING ================================== //

    async fn provision(
        &self,
        target: BlueprintTarget,
        record: DeploymentRecord,
        mut machine: StatusMachine,
        shutdown_signal: ShutdownSignal,
    ) {
        let document_id = target.document_id.clone();
        let result = self
            .submit_and_poll(&target, &record, &mut machine, shutdown_signal)
            .await;

        if let Err(e) = result {
            error!(document_id = %document_id, "Error creating deployment: {}", e);
            let message = e.to_string();
            let status = match next_status(&mut machine, StatusEvent::ProvisionFailed(message.clone())) {
                Ok(status) => status,
                Err(transition_err) => {
                    warn!(document_id = %document_id, "Not recording failure: {}", transition_err);
                    return;
                }
            };
            let update = DeploymentUpdate::new()
                .status(status)
                .error(message.clone())
                .message(format!("Deployment failed: {}", message));
            if let Err(write_err) = self.store.update(&document_id, &update).await {
                error!(document_id = %document_id, "Failed to record deployment error: {}", write_err);
            }
        }
    }

    async fn submit_and_poll(
        &self,
        target: &BlueprintTarget,
        record: &DeploymentRecord,
        machine: &mut StatusMachine,
        shutdown_signal: ShutdownSignal,
    ) -> Result<(), ProcessorError> {
        let document_id = target.document_id.as_str();
        let deployment_id = generate_deployment_id();
        let request = build_create_request(&self.config, target, record);
        debug!(
            document_id,
            deployment_id = %deployment_id,
            gcs_source = %request.terraform_blueprint.gcs_source,
            state_bucket = %self.config.state_source(),
            variables = request.terraform_blueprint.input_values.len(),
            "Prepared deployment request"
        );

        self.store
            .update(document_id, &DeploymentUpdate::new().message(SUBMITTING_MESSAGE))
            .await?;

        let operation = self
            .infra
            .create_deployment(&target.region, &deployment_id, &request)
            .await?;
        let console_url = self.config.console_url(&target.region, &deployment_id);

        info!(
            document_id,
            deployment_id = %deployment_id,
            operation = %operation.name,
            "Deployment submitted"
        );
        self.store
            .update(
                document_id,
                &DeploymentUpdate::new()
                    .operation_name(operation.name.clone())
                    .deployment_id(deployment_id.clone())
                    .console_url(console_url.clone())
                    .message(SUBMITTED_MESSAGE),
            )
            .await?;

        let mut poller = OperationPoller::new(
            self.infra.as_ref(),
            operation.name.clone(),
            self.poll.provision,
            shutdown_signal,
        );
        let max_attempts = poller.budget().max_attempts;

        loop {
            match poller.next_check(tokio::time::sleep).await {
                PollCheck::Pending { attempt } => {
                    info!(document_id, attempt, max_attempts, "Deployment in progress");
                    let status = next_status(machine, StatusEvent::ProvisionPolled)?;
                    let update = DeploymentUpdate::new()
                        .status(status)
                        .attempt(attempt, max_attempts)
                        .message(format!(
                            "Deployment in progress (check {}/{})",
                            attempt, max_attempts
                        ));
                    self.store.update(document_id, &update).await?;
                }
                PollCheck::Unreachable { .. } => {}
                PollCheck::Done { attempt, operation } => {
                    let update = match operation.error {
                        Some(op_error) => {
                            error!(document_id, attempt, "Deployment failed: {}", op_error);
                            let status = next_status(
                                machine,
                                StatusEvent::ProvisionFailed(op_error.to_string()),
                            )?;
                            DeploymentUpdate::new()
                                .status(status)
                                .error(serde_json::to_value(&op_error)?)
                        }
                        None => {
                            info!(document_id, attempt, "Deployment completed successfully");
                            let status = next_status(machine, StatusEvent::ProvisionSucceeded)?;
                            DeploymentUpdate::new()
                                .status(status)
                                .result(operation.response.unwrap_or(Value::Null))
                                .console_url(console_url)
                        }
                    };
                    return self.store.update(document_id, &update).await;
                }
                PollCheck::Exhausted => {
                    info!(
                        document_id,
                        max_attempts,
                        "Deployment status check timeout reached, continuing in background"
                    );
                    let status = next_status(machine, StatusEvent::ProvisionTimedOut)?;
                    let update = DeploymentUpdate::new()
                        .status(status)
                        .message(BACKGROUND_MESSAGE);
                    return self.store.update(document_id, &update).await;
                }
                PollCheck::Cancelled => {
                    info!(document_id, "Stopped tracking deployment on shutdown");
                    return Ok(());
                }
            }
        }
    }

    // ================================= DELETION ===================================== //

    async fn track_deletion(
        &self,
        document_id: &str,
        operation_name: &str,
        mut machine: StatusMachine,
        shutdown_signal: ShutdownSignal,
    ) {
        let result = self
            .poll_deletion(document_id, operation_name, &mut machine, shutdown_signal)
            .await;

        if let Err(e) = result {
            error!(document_id, "Error tracking deletion: {}", e);
            let message = e.to_string();
            let status = match next_status(&mut machine, StatusEvent::DeleteFailed(message.clone())) {
                Ok(status) => status,
                Err(transition_err) => {
                    warn!(document_id, "Not recording failure: {}", transition_err);
                    return;
                }
            };
            let update = DeploymentUpdate::new().status(status).error(message);
            if let Err(write_err) = self.store.update(document_id, &update).await {
                error!(document_id, "Failed to record deletion error: {}", write_err);
            }
        }
    }

    async fn poll_deletion(
        &self,
        document_id: &str,
        operation_name: &str,
        machine: &mut StatusMachine,
        shutdown_signal: ShutdownSignal,
    ) -> Result<(), ProcessorError> {
        let mut poller = OperationPoller::new(
            self.infra.as_ref(),
            operation_name,
            self.poll.deletion,
            shutdown_signal,
        );
        let max_attempts = poller.budget().max_attempts;

        loop {
            match poller.next_check(tokio::time::sleep).await {
                PollCheck::Pending { attempt } => {
                    debug!(document_id, attempt, max_attempts, "Deletion in progress");
                    let status = next_status(machine, StatusEvent::DeletePolled)?;
                    let update = DeploymentUpdate::new()
                        .status(status)
                        .attempt(attempt, max_attempts);
                    self.store.update(document_id, &update).await?;
                }
                PollCheck::Unreachable { .. } => {}
                PollCheck::Done { attempt, operation } => {
                    return match operation.error {
                        Some(op_error) => {
                            error!(document_id, attempt, "Deletion failed: {}", op_error);
                            let status = next_status(
                                machine,
                                StatusEvent::DeleteFailed(op_error.to_string()),
                            )?;
                            let update = DeploymentUpdate::new()
                                .status(status)
                                .error(serde_json::to_value(&op_error)?);
                            self.store.update(document_id, &update).await
                        }
                        None => {
                            info!(document_id, attempt, "Deletion completed successfully");
                            // a failed removal still leaves DeleteFailed open
                            self.store.delete(document_id).await?;
                            machine.process(StatusEvent::DeleteSucceeded)?;
                            Ok(())
                        }
                    };
                }
                PollCheck::Exhausted => {
                    warn!(document_id, max_attempts, "Deletion status check timed out");
                    let status = next_status(machine, StatusEvent::DeleteTimedOut)?;
                    let update = DeploymentUpdate::new()
                        .status(status)
                        .message(DELETE_TIMEOUT_MESSAGE);
                    return self.store.update(document_id, &update).await;
                }
                PollCheck::Cancelled => {
                    info!(document_id, "Stopped tracking deletion on shutdown");
                    return Ok(());
                }
            }
        }
    }

    // ================================== HELPERS ===================================== //

    /// Read a record and check its status precondition
    async fn load_record(
        &self,
        document_id: &str,
        expected: DeploymentStatus,
    ) -> Result<DeploymentRecord, ProcessorError> {
        let record = self
            .store
            .get(document_id)
            .await?
            .ok_or_else(|| ProcessorError::NotFound(format!("deployment {}", document_id)))?;

        if record.status != Some(expected) {
            warn!(
                document_id,
                expected = %expected,
                found = %record.status_label(),
                "Rejecting request for record in wrong status"
            );
            return Err(ProcessorError::InvalidStatus {
                expected,
                found: record.status_label(),
            });
        }
        Ok(record)
    }

    fn shutdown_signal(&self) -> Result<ShutdownSignal, ProcessorError> {
        // Subscribe before checking the flag so a concurrent shutdown is
        // either seen here or delivered to the receiver.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.closing.load(Ordering::SeqCst) {
            return Err(ProcessorError::ShutdownError(
                "processor is shutting down".to_string(),
            ));
        }
        Ok(Box::pin(async move {
            let _ = shutdown_rx.recv().await;
        }))
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // reap finished tasks
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }
}

fn next_status(
    machine: &mut StatusMachine,
    event: StatusEvent,
) -> Result<DeploymentStatus, ProcessorError> {
    match machine.process(event)? {
        Transition::To(status) => Ok(status),
        Transition::Removed => Err(ProcessorError::InvalidTransition(
            "record removed".to_string(),
        )),
    }
}
