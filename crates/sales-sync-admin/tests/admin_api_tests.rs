use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use sales_sync_admin::{build_router, AppState};
use sales_sync_crypto::PlaintextSecretProvider;
use sales_sync_engine::Orchestrator;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

fn build_state(pool: PgPool) -> AppState {
    let store = Store::from_pool(pool);
    let remote = Arc::new(RemoteClient::new("http://127.0.0.1:0"));
    let secrets = Arc::new(PlaintextSecretProvider);
    let orchestrator = Orchestrator::new(store.clone(), remote, secrets.clone());
    AppState::new(store, orchestrator, secrets)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[sqlx::test]
async fn health_reports_ok_against_a_live_database(pool: PgPool) {
    let router = build_router(build_state(pool));

    let response = router
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[sqlx::test]
async fn create_list_rename_and_delete_a_credential(pool: PgPool) {
    let router = build_router(build_state(pool));

    let create = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/keys")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"key": "sk_live_abc123", "displayName": "Studio A"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    assert_eq!(created["label"], "Studio A");
    assert_eq!(created["tailHash"], "c123");
    let id = created["id"].as_str().unwrap().to_string();

    let list = router
        .clone()
        .oneshot(Request::builder().uri("/api/keys").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let listed = body_json(list).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let rename = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/keys/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"displayName": "Studio A (renamed)"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rename.status(), StatusCode::OK);
    let renamed = body_json(rename).await;
    assert_eq!(renamed["label"], "Studio A (renamed)");

    let delete = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/keys/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let stats = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/keys/{id}/stats"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn create_key_rejects_an_empty_key(pool: PgPool) {
    let router = build_router(build_state(pool));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/keys")
                .header("content-type", "application/json")
                .body(Body::from(json!({"key": "   "}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[sqlx::test]
async fn sync_status_for_unknown_sync_id_is_404(pool: PgPool) {
    let router = build_router(build_state(pool));

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/sync/status/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn retry_failed_reports_zero_when_nothing_failed(pool: PgPool) {
    let router = build_router(build_state(pool));

    let create = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/keys")
                .header("content-type", "application/json")
                .body(Body::from(json!({"key": "sk_live_abc123"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let created = body_json(create).await;
    let id = created["id"].as_str().unwrap().to_string();

    let retry = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sync/retry/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(retry.status(), StatusCode::OK);
    let body = body_json(retry).await;
    assert_eq!(body["reset"], 0);
}
