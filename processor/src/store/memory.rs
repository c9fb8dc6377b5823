//! In-process document store

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::errors::ProcessorError;
use crate::models::deployment::{DeploymentRecord, DeploymentUpdate};
use crate::store::DocumentStore;

/// Records held as raw JSON field maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document
    pub async fn insert(&self, document_id: &str, fields: Map<String, Value>) {
        let mut documents = self.documents.write().await;
        documents.insert(document_id.to_string(), fields);
    }

    /// Raw fields of a document
    pub async fn fields(&self, document_id: &str) -> Option<Map<String, Value>> {
        let documents = self.documents.read().await;
        documents.get(document_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, document_id: &str) -> Result<Option<DeploymentRecord>, ProcessorError> {
        match self.fields(document_id).await {
            Some(fields) => Ok(Some(DeploymentRecord::from_fields(fields)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        document_id: &str,
        update: &DeploymentUpdate,
    ) -> Result<(), ProcessorError> {
        let fields = update.to_fields()?;
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(document_id)
            .ok_or_else(|| ProcessorError::NotFound(format!("deployment {}", document_id)))?;
        document.extend(fields);
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<(), ProcessorError> {
        let mut documents = self.documents.write().await;
        documents.remove(document_id);
        Ok(())
    }
}
