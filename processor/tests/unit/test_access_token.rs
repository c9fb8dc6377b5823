//! Metadata server token provider against a fake metadata server

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use inframgr_processor::authn::access_token::{AccessTokenProvider, MetadataTokenProvider};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::support::spawn_server;

#[derive(Clone)]
struct FakeMetadata {
    hits: Arc<AtomicU32>,
    expires_in: i64,
}

async fn token_handler(State(fake): State<FakeMetadata>, headers: HeaderMap) -> Response {
    if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return StatusCode::FORBIDDEN.into_response();
    }
    let n = fake.hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("ya29.token-{}", n),
        "expires_in": fake.expires_in,
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn provider(expires_in: i64) -> (MetadataTokenProvider, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(token_handler),
        )
        .with_state(FakeMetadata {
            hits: hits.clone(),
            expires_in,
        });
    let base_url = spawn_server(app).await;

    let provider = MetadataTokenProvider::new(&format!("{}/computeMetadata/v1", base_url)).unwrap();
    (provider, hits)
}

#[tokio::test]
async fn test_token_is_cached_until_near_expiry() {
    let (provider, hits) = provider(3600).await;

    let first = provider.access_token().await.unwrap();
    let second = provider.access_token().await.unwrap();

    assert_eq!(first.expose_secret(), "ya29.token-1");
    assert_eq!(second.expose_secret(), "ya29.token-1");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_short_lived_token_is_refetched() {
    // inside the refresh margin, so never considered fresh
    let (provider, hits) = provider(30).await;

    provider.access_token().await.unwrap();
    let second = provider.access_token().await.unwrap();

    assert_eq!(second.expose_secret(), "ya29.token-2");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_metadata_error_is_auth_error() {
    let app = Router::new();
    let base_url = spawn_server(app).await;
    let provider = MetadataTokenProvider::new(&base_url).unwrap();

    let err = provider.access_token().await.unwrap_err();
    assert!(err.to_string().contains("Authentication error"));
}
