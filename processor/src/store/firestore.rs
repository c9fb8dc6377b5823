//! Firestore REST document store

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::authn::access_token::AccessTokenProvider;
use crate::config::FirestoreConfig;
use crate::errors::ProcessorError;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentRecord, DeploymentUpdate};
use crate::store::value::{decode_fields, encode_fields, timestamp_value};
use crate::store::DocumentStore;

/// Firestore document resource
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,

    #[serde(default)]
    fields: Map<String, Value>,
}

/// Deployment records stored in a Firestore collection
pub struct FirestoreStore {
    http_client: Arc<HttpClient>,
    tokens: Arc<dyn AccessTokenProvider>,
    collection_path: String,
}

impl FirestoreStore {
    pub fn new(
        http_client: Arc<HttpClient>,
        tokens: Arc<dyn AccessTokenProvider>,
        project_id: &str,
        config: &FirestoreConfig,
    ) -> Self {
        Self {
            http_client,
            tokens,
            collection_path: format!(
                "projects/{}/databases/{}/documents/{}",
                project_id, config.database, config.collection
            ),
        }
    }

    fn document_path(&self, document_id: &str) -> String {
        format!("{}/{}", self.collection_path, document_id)
    }
}

/// Encode an update's fields; `updatedAt` is written as a native timestamp
fn encode_update(update: &DeploymentUpdate) -> Result<Map<String, Value>, ProcessorError> {
    let mut fields = encode_fields(&update.to_fields()?);
    fields.insert("updatedAt".to_string(), timestamp_value(update.updated_at));
    Ok(fields)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, document_id: &str) -> Result<Option<DeploymentRecord>, ProcessorError> {
        let token = self.tokens.access_token().await?;
        let path = self.document_path(document_id);

        let document: Document = match self.http_client.get(&path, &token).await {
            Ok(document) => document,
            Err(e) if e.is_not_found() => {
                debug!(document_id, "Deployment document not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let fields = decode_fields(&document.fields)?;
        Ok(Some(DeploymentRecord::from_fields(fields)?))
    }

    async fn update(
        &self,
        document_id: &str,
        update: &DeploymentUpdate,
    ) -> Result<(), ProcessorError> {
        let token = self.tokens.access_token().await?;
        let path = self.document_path(document_id);
        let fields = encode_update(update)?;

        // Only the listed fields are touched; the precondition makes the
        // write fail instead of creating a new document.
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|key| ("updateMask.fieldPaths", key.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let body = Document {
            name: None,
            fields: fields.clone(),
        };

        let result: Result<Document, ProcessorError> =
            self.http_client.patch(&path, &token, &query, &body).await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(ProcessorError::NotFound(format!(
                "deployment {}",
                document_id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, document_id: &str) -> Result<(), ProcessorError> {
        let token = self.tokens.access_token().await?;
        let path = self.document_path(document_id);
        let _: Value = self.http_client.delete(&path, &token, &[]).await?;
        Ok(())
    }
}
