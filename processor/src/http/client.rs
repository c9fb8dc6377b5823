//! HTTP client for Google REST APIs

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::ProcessorError;

/// Header naming the project that is billed for the request
pub const USER_PROJECT_HEADER: &str = "X-Goog-User-Project";

/// Authenticated JSON client bound to one API base URL
pub struct HttpClient {
    client: Client,
    base_url: String,
    quota_project: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, ProcessorError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            quota_project: None,
        })
    }

    /// Create a client that bills every request to `project_id`
    pub fn with_quota_project(base_url: &str, project_id: &str) -> Result<Self, ProcessorError> {
        let mut client = Self::new(base_url)?;
        client.quota_project = Some(project_id.to_string());
        Ok(client)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, ProcessorError> {
        let request = self.request(Method::GET, path, token);
        self.execute(Method::GET, path, request).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ProcessorError> {
        let request = self.request(Method::POST, path, token).query(query).json(body);
        self.execute(Method::POST, path, request).await
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ProcessorError> {
        let request = self.request(Method::PATCH, path, token).query(query).json(body);
        self.execute(Method::PATCH, path, request).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
        query: &[(&str, &str)],
    ) -> Result<T, ProcessorError> {
        let request = self.request(Method::DELETE, path, token).query(query);
        self.execute(Method::DELETE, path, request).await
    }

    fn request(&self, method: Method, path: &str, token: &SecretString) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .client
            .request(method, &url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );

        if let Some(project) = &self.quota_project {
            request = request.header(USER_PROJECT_HEADER, project);
        }

        request
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ProcessorError> {
        debug!("{} {}/{}", method, self.base_url, path.trim_start_matches('/'));

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, path, status, body);
            return Err(ProcessorError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}
