//! OAuth access tokens for Google APIs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::errors::ProcessorError;

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens, swappable in tests
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, ProcessorError>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<SecretString, ProcessorError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Default service account token from the GCE / Cloud Run metadata server
pub struct MetadataTokenProvider {
    client: Client,
    token_url: String,
    cached_token: RwLock<Option<CachedToken>>,
}

impl MetadataTokenProvider {
    /// `metadata_base` is the `computeMetadata/v1` root
    pub fn new(metadata_base: &str) -> Result<Self, ProcessorError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            token_url: format!(
                "{}/instance/service-accounts/default/token",
                metadata_base.trim_end_matches('/')
            ),
            cached_token: RwLock::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken, ProcessorError> {
        debug!("GET {}", self.token_url);

        let response = self
            .client
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Metadata token request failed: {} - {}", status, body);
            return Err(ProcessorError::AuthError(format!(
                "metadata server returned {}: {}",
                status, body
            )));
        }

        let body: MetadataTokenResponse = response.json().await?;
        let expires_at = Utc::now() + chrono::Duration::seconds(body.expires_in);
        info!("Fetched access token from metadata server, expires at: {}", expires_at);

        Ok(CachedToken {
            token: SecretString::from(body.access_token),
            expires_at,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<SecretString, ProcessorError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token.token)
    }
}
