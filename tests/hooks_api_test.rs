mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceExt;
use upload_reconciler::config::{ServerConfig, StorageSettings};
use upload_reconciler::models::{ObjectAcl, ObjectMetadata};
use upload_reconciler::services::events::LocalEventBus;
use upload_reconciler::services::reconciler::UploadReconciler;
use upload_reconciler::services::schema::SchemaRegistry;
use upload_reconciler::services::storage::SharedClientConnector;
use upload_reconciler::{AppState, create_app};

fn app(mock: &Arc<MockBucketClient>, settings: StorageSettings, secret: Option<&str>) -> Router {
    let (_tx, settings_rx) = watch::channel(settings);

    let events = Arc::new(LocalEventBus::new());
    let reconciler = Arc::new(UploadReconciler::new(Arc::new(SharedClientConnector::new(
        mock.clone(),
    ))));
    reconciler.subscribe(events.as_ref(), settings_rx.clone());

    let config = ServerConfig {
        hook_secret: secret.map(str::to_string),
        ..ServerConfig::default()
    };

    create_app(AppState {
        events,
        schemas: Arc::new(SchemaRegistry::new(vec![collection()])),
        settings: settings_rx,
        config,
    })
}

fn hook(kind: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/hooks/records/{}", kind))
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn doc_upload(stored: &str, original: &str) -> Value {
    json!({
        "collection": "documents",
        "record_id": "rec1",
        "files": {
            "doc": [{"name": stored, "original_name": original}]
        }
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_created_hook_reconciles_uploads() {
    let mock = Arc::new(MockBucketClient::new());
    mock.put(&key("report_x1.pdf"), ObjectMetadata::default());
    let app = app(&mock, enabled_settings(), None);

    let response = app
        .oneshot(hook("created", doc_upload("report_x1.pdf", "My Report.pdf"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["headers_rewritten"], 1);
    assert_eq!(body["headers_skipped"], 0);
    assert_eq!(body["acl_applied"], 1);

    let stored = mock.object(&key("report_x1.pdf")).unwrap();
    assert_eq!(
        stored.content_disposition.as_deref(),
        Some(r#"attachment; filename="My Report.pdf""#)
    );
    assert_eq!(mock.acl(&key("report_x1.pdf")), Some(ObjectAcl::Private));
}

#[tokio::test]
async fn test_update_hook_skips_tagged_objects() {
    let mock = Arc::new(MockBucketClient::new());
    mock.put(
        &key("a.pdf"),
        ObjectMetadata {
            content_disposition: Some(r#"attachment; filename="a.pdf""#.to_string()),
            ..ObjectMetadata::default()
        },
    );
    let app = app(&mock, enabled_settings(), None);

    let response = app
        .oneshot(hook("update", doc_upload("a.pdf", "a.pdf"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["headers_rewritten"], 0);
    assert_eq!(body["headers_skipped"], 1);
    assert_eq!(body["acl_applied"], 1);
}

#[tokio::test]
async fn test_hook_with_storage_disabled_is_a_noop() {
    let mock = Arc::new(MockBucketClient::new());
    let app = app(&mock, StorageSettings::default(), None);

    let response = app
        .oneshot(hook("created", doc_upload("a.pdf", "a.pdf"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["headers_rewritten"], 0);
    assert_eq!(body["acl_applied"], 0);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_hook_failure_returns_stage_message() {
    let mock = Arc::new(MockBucketClient::new());
    let app = app(&mock, enabled_settings(), None);

    // the object was never stored, so fetching its metadata fails
    let response = app
        .oneshot(hook("created", doc_upload("missing.pdf", "m.pdf"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body, json!({"error": "fix object headers failed"}));
}

#[tokio::test]
async fn test_hook_requires_secret_when_configured() {
    let mock = Arc::new(MockBucketClient::new());
    mock.put(&key("a.pdf"), ObjectMetadata::default());
    let app = app(&mock, enabled_settings(), Some("s3cret"));

    let response = app
        .clone()
        .oneshot(hook("created", doc_upload("a.pdf", "a.pdf"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(hook("created", doc_upload("a.pdf", "a.pdf"), Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"error": "Invalid hook secret"}));
    assert!(mock.calls().is_empty());

    let response = app
        .oneshot(hook("created", doc_upload("a.pdf", "a.pdf"), Some("s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_hook_rejects_unknown_collection_and_kind() {
    let mock = Arc::new(MockBucketClient::new());
    let app = app(&mock, enabled_settings(), None);

    let body = json!({"collection": "nope", "record_id": "rec1", "files": {}});
    let response = app.clone().oneshot(hook("created", body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(hook("deleted", doc_upload("a.pdf", "a.pdf"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_hook_for_unhooked_collection_is_a_noop() {
    let mock = Arc::new(MockBucketClient::new());
    let (_tx, settings_rx) = watch::channel(enabled_settings());
    let events = Arc::new(LocalEventBus::new());
    let reconciler = Arc::new(
        UploadReconciler::new(Arc::new(SharedClientConnector::new(mock.clone())))
            .with_collections(vec!["posts".to_string()]),
    );
    reconciler.subscribe(events.as_ref(), settings_rx.clone());
    let app = create_app(AppState {
        events,
        schemas: Arc::new(SchemaRegistry::new(vec![collection()])),
        settings: settings_rx,
        config: ServerConfig::default(),
    });

    let response = app
        .oneshot(hook("created", doc_upload("a.pdf", "a.pdf"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["headers_rewritten"], 0);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_health_reports_storage_and_collections() {
    let mock = Arc::new(MockBucketClient::new());
    let app = app(&mock, enabled_settings(), Some("s3cret"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "enabled");
    assert_eq!(body["collections"], 1);
}
