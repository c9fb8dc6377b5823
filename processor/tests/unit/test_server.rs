//! Router tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use inframgr_processor::deploy::poller::PollOptions;
use inframgr_processor::errors::ProcessorError;
use inframgr_processor::server::request_id::REQUEST_ID_HEADER;
use inframgr_processor::server::serve::router;
use inframgr_processor::server::state::ServerState;
use inframgr_processor::store::memory::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::support::*;

const DOC_ID: &str = "sandbox-doc-2";

/// Default budgets: the first status check is seconds away, so records
/// stay in their accepted status while a test inspects them
fn app(store: Arc<MemoryStore>, infra: Arc<ScriptedInfra>) -> Router {
    let orchestrator = orchestrator(store, infra, PollOptions::default());
    router(Arc::new(ServerState::new(orchestrator)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app(Arc::new(MemoryStore::new()), ScriptedInfra::new(Vec::new()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("infra-manager-processor"));
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_version() {
    let app = app(Arc::new(MemoryStore::new()), ScriptedInfra::new(Vec::new()));
    let request = Request::builder().uri("/version").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("git_hash").is_some());
    assert!(body.get("build_time").is_some());
}

#[tokio::test]
async fn test_request_id_header() {
    let app = app(Arc::new(MemoryStore::new()), ScriptedInfra::new(Vec::new()));

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(generated.starts_with("req-"));
    assert_eq!(generated.rsplit('-').next().unwrap().len(), 8);

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "caller-supplied")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "caller-supplied");
}

#[tokio::test]
async fn test_create_accepts_request() {
    let store = seeded_store(DOC_ID, "provision_requested").await;
    let app = app(store.clone(), ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json(
            "/create",
            json!({"documentId": DOC_ID, "data": {"name": "demo", "type": "basic-vm", "region": "us-central1"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "documentId": DOC_ID, "message": "Deployment initiated"})
    );
    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("provision_pending")
    );
}

#[tokio::test]
async fn test_create_validation() {
    let store = seeded_store(DOC_ID, "provision_requested").await;
    let app = app(store.clone(), ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app.clone(),
        post_json("/create", json!({"data": {"type": "basic-vm", "region": "us-central1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing documentId in request"));

    let (status, body) = send(
        app.clone(),
        post_json("/create", json!({"documentId": DOC_ID, "data": {"type": "basic-vm"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required data fields"));

    let request = Request::builder()
        .method("POST")
        .uri("/create")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("provision_requested")
    );
}

#[tokio::test]
async fn test_create_missing_document() {
    let app = app(Arc::new(MemoryStore::new()), ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json(
            "/create",
            json!({"documentId": "nope", "data": {"type": "basic-vm", "region": "us-central1"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Deployment document not found"));
}

#[tokio::test]
async fn test_create_wrong_status() {
    let store = seeded_store(DOC_ID, "provision_successful").await;
    let app = app(store, ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json(
            "/create",
            json!({"documentId": DOC_ID, "data": {"type": "basic-vm", "region": "us-central1"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid deployment status"));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("provision_requested"));
}

#[tokio::test]
async fn test_delete_returns_operation() {
    let store = seeded_store(DOC_ID, "delete_requested").await;
    let app = app(store.clone(), ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json(
            "/delete",
            json!({"documentId": DOC_ID, "data": {"infraManagerDeploymentId": "deploy-1-abcd1234", "region": "us-central1"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "documentId": DOC_ID,
            "message": "Deletion initiated",
            "operationName": OPERATION_NAME
        })
    );
    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("delete_pending")
    );
}

#[tokio::test]
async fn test_delete_validation() {
    let store = seeded_store(DOC_ID, "delete_requested").await;
    let app = app(store, ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json("/delete", json!({"documentId": DOC_ID, "data": {"region": "us-central1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required data fields"));
}

#[tokio::test]
async fn test_delete_submission_failure_is_500() {
    let store = seeded_store(DOC_ID, "delete_requested").await;
    let app = app(store.clone(), ScriptedInfra::failing_submission(unavailable()));

    let (status, body) = send(
        app,
        post_json(
            "/delete",
            json!({"documentId": DOC_ID, "data": {"infraManagerDeploymentId": "deploy-1-abcd1234", "region": "us-central1"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Failed to process request"));
    assert!(body["message"].as_str().unwrap().contains("503"));
    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("delete_error")
    );
}

#[tokio::test]
async fn test_delete_upstream_404_is_500() {
    let store = seeded_store(DOC_ID, "delete_requested").await;
    let gone = ProcessorError::ApiError {
        status: 404,
        body: "deployment not found".to_string(),
    };
    let app = app(store.clone(), ScriptedInfra::failing_submission(gone));

    let (status, body) = send(
        app,
        post_json(
            "/delete",
            json!({"documentId": DOC_ID, "data": {"infraManagerDeploymentId": "deploy-1-abcd1234", "region": "us-central1"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Failed to process request"));
    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("delete_error")
    );
}

#[tokio::test]
async fn test_create_accepts_cli_written_record() {
    let store = Arc::new(MemoryStore::new());
    let fields = json!({
        "status": "provision_requested",
        "templateName": "basic-vm",
        "variables": null,
        "createdAt": "October 18, 2026 at 3:4:5.123 PM UTC-7",
        "updatedAt": "October 18, 2026 at 3:4:5.123 PM UTC-7",
        "_updateSource": "cli"
    });
    store
        .insert(DOC_ID, fields.as_object().cloned().unwrap())
        .await;
    let app = app(store.clone(), ScriptedInfra::new(Vec::new()));

    let (status, body) = send(
        app,
        post_json(
            "/create",
            json!({"documentId": DOC_ID, "data": {"type": "basic-vm", "region": "us-central1"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Deployment initiated"));
    assert_eq!(
        store.fields(DOC_ID).await.unwrap()["status"],
        json!("provision_pending")
    );
}
