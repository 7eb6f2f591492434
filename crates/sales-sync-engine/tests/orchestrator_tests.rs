use std::sync::Arc;

use sales_sync_crypto::{PlaintextSecretProvider, SecretProvider};
use sales_sync_engine::orchestrator::Orchestrator;
use sales_sync_engine::progress::progress_channel;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn changed_dates_body(dates: &[&str], result_highwatermark: i64) -> serde_json::Value {
    serde_json::json!({
        "response": { "dates": dates, "result_highwatermark": result_highwatermark }
    })
}

fn detailed_sales_body(app_id: i64, max_id: i64) -> serde_json::Value {
    serde_json::json!({
        "response": {
            "results": [{
                "line_item_type": "sale",
                "app_id": app_id,
                "package_id": null,
                "bundle_id": null,
                "partner_id": null,
                "game_item_id": null,
                "country_code": "US",
                "platform": "steam",
                "currency": "USD",
                "discount_id": null,
                "discount_percentage": null,
                "base_price": "19.99",
                "sale_price": "14.99",
                "avg_sale_price_usd": "14.99",
                "gross_units_sold": 2,
                "gross_units_returned": 0,
                "gross_units_activated": 2,
                "net_units_sold": 2,
                "gross_sales_usd": "29.98",
                "gross_returns_usd": "0.00",
                "net_sales_usd": "29.98",
                "net_tax_usd": "0.00"
            }],
            "max_id": max_id,
            "app_info": [{"id": app_id.to_string(), "name": "Example Game"}],
            "package_info": [],
            "bundle_info": [],
            "partner_info": [],
            "country_info": [{"id": "US", "name": "United States"}],
            "game_item_info": [],
            "combined_discount_info": []
        }
    })
}

#[sqlx::test]
async fn run_sync_advances_highwatermark_on_full_success(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(changed_dates_body(&["2026-01-15"], 100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/GetDetailedSales/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detailed_sales_body(440, 0)))
        .mount(&server)
        .await;

    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new(server.uri())),
        Arc::new(PlaintextSecretProvider),
    );

    let (sender, _receiver) = progress_channel();
    let sync_id = sales_sync_core::types::SyncId::new();
    let cancel = CancellationToken::new();

    let outcome = orchestrator
        .run_sync(credential.id, sync_id, sender, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.dates_found, 1);
    assert_eq!(outcome.records_processed, 1);

    let reloaded = store.get_credential(credential.id).await.unwrap();
    assert_eq!(reloaded.highwatermark, 100);
    assert!(reloaded.last_sync_at.is_some());

    let counts = store.counts_by_status(credential.id).await.unwrap();
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.failed, 0);
}

#[sqlx::test]
async fn run_sync_with_no_changed_dates_still_commits_highwatermark(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(changed_dates_body(&[], 7)))
        .mount(&server)
        .await;

    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new(server.uri())),
        Arc::new(PlaintextSecretProvider),
    );

    let (sender, _receiver) = progress_channel();
    let sync_id = sales_sync_core::types::SyncId::new();
    let cancel = CancellationToken::new();

    let outcome = orchestrator
        .run_sync(credential.id, sync_id, sender, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.dates_found, 0);
    assert_eq!(outcome.records_processed, 0);

    let reloaded = store.get_credential(credential.id).await.unwrap();
    assert_eq!(reloaded.highwatermark, 7);
}

#[sqlx::test]
async fn run_sync_does_not_advance_highwatermark_when_a_task_fails(pool: PgPool) {
    tokio::time::pause();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(changed_dates_body(&["2026-01-15"], 100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/GetDetailedSales/v1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new(server.uri())),
        Arc::new(PlaintextSecretProvider),
    );

    let (sender, _receiver) = progress_channel();
    let sync_id = sales_sync_core::types::SyncId::new();
    let cancel = CancellationToken::new();

    let outcome = orchestrator
        .run_sync(credential.id, sync_id, sender, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.dates_found, 1);
    assert_eq!(outcome.records_processed, 0);

    let reloaded = store.get_credential(credential.id).await.unwrap();
    assert_eq!(reloaded.highwatermark, 0, "highwatermark must not advance when a task failed");

    let counts = store.counts_by_status(credential.id).await.unwrap();
    assert_eq!(counts.failed, 1);
}

#[sqlx::test]
async fn run_sync_completes_a_batch_larger_than_the_concurrency_limit(pool: PgPool) {
    // sales_sync_core::constants::CONCURRENT_TASKS is 8; a dozen dates in one
    // changed-dates response forces more than one date in flight to wait on
    // a semaphore permit released by another in-flight fetch.
    let dates: Vec<String> = (1..=12).map(|day| format!("2026-01-{day:02}")).collect();
    let date_refs: Vec<&str> = dates.iter().map(String::as_str).collect();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(changed_dates_body(&date_refs, 200)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/GetDetailedSales/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detailed_sales_body(440, 0)))
        .mount(&server)
        .await;

    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new(server.uri())),
        Arc::new(PlaintextSecretProvider),
    );

    let (sender, _receiver) = progress_channel();
    let sync_id = sales_sync_core::types::SyncId::new();
    let cancel = CancellationToken::new();

    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        orchestrator.run_sync(credential.id, sync_id, sender, &cancel),
    )
    .await
    .expect("run_sync must not deadlock when a batch exceeds the concurrency limit")
    .unwrap();

    assert_eq!(outcome.dates_found, 12);
    assert_eq!(outcome.records_processed, 12);

    let counts = store.counts_by_status(credential.id).await.unwrap();
    assert_eq!(counts.completed, 12);
    assert_eq!(counts.failed, 0);
}

#[sqlx::test]
async fn sync_status_reflects_the_terminal_progress_event(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(changed_dates_body(&[], 3)))
        .mount(&server)
        .await;

    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new(server.uri())),
        Arc::new(PlaintextSecretProvider),
    );

    let (sender, _receiver) = progress_channel();
    let sync_id = sales_sync_core::types::SyncId::new();
    let cancel = CancellationToken::new();

    orchestrator.run_sync(credential.id, sync_id, sender, &cancel).await.unwrap();

    match orchestrator.sync_status(sync_id).await {
        Some(sales_sync_core::model::SyncProgress::Complete { .. }) => {}
        other => panic!("expected a terminal Complete snapshot, got {other:?}"),
    }
}

#[sqlx::test]
async fn retry_failed_resets_failed_tasks_to_pending(pool: PgPool) {
    let store = Store::from_pool(pool);
    let secrets = PlaintextSecretProvider;
    let credential = store
        .insert_credential("partner-a", &secrets.encrypt("test-key").unwrap(), "ykey")
        .await
        .unwrap();

    let date = sales_sync_core::types::DateKey::today();
    store.enqueue_task(credential.id, date).await.unwrap();
    let claimed = store.claim_batch(credential.id, 1).await.unwrap();
    store.fail_task(claimed[0].id, "boom").await.unwrap();

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(RemoteClient::new("http://127.0.0.1:0")),
        Arc::new(PlaintextSecretProvider),
    );

    let reset = orchestrator.retry_failed(credential.id).await.unwrap();
    assert_eq!(reset, 1);

    let counts = orchestrator.pending_status(credential.id).await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.failed, 0);
}
