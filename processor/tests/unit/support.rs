//! Shared fakes for the integration tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use inframgr_processor::config::Config;
use inframgr_processor::deploy::orchestrator::Orchestrator;
use inframgr_processor::deploy::poller::{PollBudget, PollOptions};
use inframgr_processor::errors::ProcessorError;
use inframgr_processor::http::infra_manager::InfraManager;
use inframgr_processor::models::deployment::{DeploymentRecord, DeploymentUpdate};
use inframgr_processor::store::memory::MemoryStore;
use inframgr_processor::store::DocumentStore;
use openapi_client::models::{CreateDeploymentRequest, Operation, OperationError};
use serde_json::{json, Map, Value};

pub const OPERATION_NAME: &str = "projects/sandbox-proj/locations/us-central1/operations/operation-1";

pub fn config() -> Config {
    Config::from_lookup(|key| match key {
        "PROJECT_ID" => Some("sandbox-proj".to_string()),
        "REGION" => Some("us-central1".to_string()),
        "ZONE" => Some("us-central1-a".to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Zero-length intervals so tests never wait
pub fn fast_poll(provision_attempts: u32, deletion_attempts: u32) -> PollOptions {
    PollOptions {
        provision: PollBudget {
            max_attempts: provision_attempts,
            interval: Duration::ZERO,
        },
        deletion: PollBudget {
            max_attempts: deletion_attempts,
            interval: Duration::ZERO,
        },
    }
}

pub fn pending() -> Operation {
    Operation {
        name: OPERATION_NAME.to_string(),
        ..Default::default()
    }
}

pub fn succeeded(response: Value) -> Operation {
    Operation {
        name: OPERATION_NAME.to_string(),
        done: true,
        response: Some(response),
        ..Default::default()
    }
}

pub fn failed(code: i32, message: &str) -> Operation {
    Operation {
        name: OPERATION_NAME.to_string(),
        done: true,
        error: Some(OperationError {
            code,
            message: message.to_string(),
            details: Vec::new(),
        }),
        ..Default::default()
    }
}

pub fn unavailable() -> ProcessorError {
    ProcessorError::ApiError {
        status: 503,
        body: "backend unavailable".to_string(),
    }
}

/// Infrastructure Manager fake answering from a script. Once the poll
/// script runs out every check reports the operation still running.
#[derive(Default)]
pub struct ScriptedInfra {
    submit_error: Mutex<Option<ProcessorError>>,
    polls: Mutex<VecDeque<Result<Operation, ProcessorError>>>,
    pub created: Mutex<Vec<(String, String, CreateDeploymentRequest)>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub checks: Mutex<u32>,
}

impl ScriptedInfra {
    pub fn new(polls: Vec<Result<Operation, ProcessorError>>) -> Arc<Self> {
        Arc::new(Self {
            polls: Mutex::new(polls.into()),
            ..Default::default()
        })
    }

    pub fn failing_submission(error: ProcessorError) -> Arc<Self> {
        Arc::new(Self {
            submit_error: Mutex::new(Some(error)),
            ..Default::default()
        })
    }

    pub fn check_count(&self) -> u32 {
        *self.checks.lock().unwrap()
    }

    fn submission(&self) -> Result<Operation, ProcessorError> {
        match self.submit_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(pending()),
        }
    }
}

#[async_trait]
impl InfraManager for ScriptedInfra {
    async fn create_deployment(
        &self,
        region: &str,
        deployment_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Operation, ProcessorError> {
        self.created.lock().unwrap().push((
            region.to_string(),
            deployment_id.to_string(),
            request.clone(),
        ));
        self.submission()
    }

    async fn delete_deployment(
        &self,
        region: &str,
        deployment_id: &str,
    ) -> Result<Operation, ProcessorError> {
        self.deleted
            .lock()
            .unwrap()
            .push((region.to_string(), deployment_id.to_string()));
        self.submission()
    }

    async fn get_operation(&self, operation_name: &str) -> Result<Operation, ProcessorError> {
        assert_eq!(operation_name, OPERATION_NAME);
        *self.checks.lock().unwrap() += 1;
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(pending()))
    }
}

pub fn record(status: &str) -> Map<String, Value> {
    json!({
        "status": status,
        "templateName": "basic-vm",
        "variables": {"billing_account": "0000-1111", "budget": 50},
        "userId": "u-1",
        "_updateSource": "firestore"
    })
    .as_object()
    .cloned()
    .unwrap()
}

pub async fn seeded_store(document_id: &str, status: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert(document_id, record(status)).await;
    store
}

pub fn orchestrator(
    store: Arc<MemoryStore>,
    infra: Arc<ScriptedInfra>,
    poll: PollOptions,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(Arc::new(config()), store, infra, poll))
}

/// `MemoryStore` wrapper whose chosen writes fail with a store error.
/// Updates are counted from 1 across the store's lifetime.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    failing_update: Option<u32>,
    failing_delete: bool,
    updates: Mutex<u32>,
}

impl FlakyStore {
    pub fn failing_update(inner: Arc<MemoryStore>, nth: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_update: Some(nth),
            failing_delete: false,
            updates: Mutex::new(0),
        })
    }

    pub fn failing_delete(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_update: None,
            failing_delete: true,
            updates: Mutex::new(0),
        })
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, document_id: &str) -> Result<Option<DeploymentRecord>, ProcessorError> {
        self.inner.get(document_id).await
    }

    async fn update(
        &self,
        document_id: &str,
        update: &DeploymentUpdate,
    ) -> Result<(), ProcessorError> {
        let n = {
            let mut updates = self.updates.lock().unwrap();
            *updates += 1;
            *updates
        };
        if self.failing_update == Some(n) {
            return Err(ProcessorError::StoreError("write rejected".to_string()));
        }
        self.inner.update(document_id, update).await
    }

    async fn delete(&self, document_id: &str) -> Result<(), ProcessorError> {
        if self.failing_delete {
            return Err(ProcessorError::StoreError("delete rejected".to_string()));
        }
        self.inner.delete(document_id).await
    }
}

pub fn orchestrator_with_store(
    store: Arc<dyn DocumentStore>,
    infra: Arc<ScriptedInfra>,
    poll: PollOptions,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(Arc::new(config()), store, infra, poll))
}

/// Serve `app` on an ephemeral local port; returns its base URL
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
