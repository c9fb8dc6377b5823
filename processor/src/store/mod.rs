//! Deployment record storage

pub mod firestore;
pub mod memory;
pub mod value;

use async_trait::async_trait;

use crate::errors::ProcessorError;
use crate::models::deployment::{DeploymentRecord, DeploymentUpdate};

/// Document store holding deployment records keyed by document id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a record; `None` when the document does not exist
    async fn get(&self, document_id: &str) -> Result<Option<DeploymentRecord>, ProcessorError>;

    /// Merge the update's fields into an existing record. Fails with
    /// `NotFound` when the document does not exist.
    async fn update(
        &self,
        document_id: &str,
        update: &DeploymentUpdate,
    ) -> Result<(), ProcessorError>;

    /// Remove a record. Removing a missing record is not an error.
    async fn delete(&self, document_id: &str) -> Result<(), ProcessorError>;
}
