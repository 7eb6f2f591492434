use sales_sync_remote::{RemoteClient, RemoteError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(start_paused = true)]
async fn retries_on_server_error_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": { "dates": ["2026-01-15"], "result_highwatermark": 42 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteClient::new(server.uri());
    let cancel = CancellationToken::new();

    let response = client.changed_dates("key", 0, &cancel).await.unwrap();
    assert_eq!(response.dates, vec!["2026-01-15".to_string()]);
    assert_eq!(response.result_highwatermark, 42);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_retries_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/GetChangedDatesForPartner/v1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = RemoteClient::new(server.uri());
    let cancel = CancellationToken::new();

    let err = client.changed_dates("key", 0, &cancel).await.unwrap_err();
    match err {
        RemoteError::Status { status, retryable, .. } => {
            assert_eq!(status, 500);
            assert!(retryable);
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_token_short_circuits_without_another_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = RemoteClient::new(server.uri());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.changed_dates("key", 0, &cancel).await.unwrap_err();
    assert!(matches!(err, RemoteError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn detailed_sales_unwraps_envelope_and_reference_arrays() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/GetDetailedSales/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": {
                "results": [{
                    "line_item_type": "sale",
                    "app_id": 440,
                    "package_id": null,
                    "bundle_id": null,
                    "partner_id": null,
                    "game_item_id": null,
                    "country_code": "us",
                    "platform": "steam",
                    "currency": "USD",
                    "discount_id": null,
                    "discount_percentage": null,
                    "base_price": "19.99",
                    "sale_price": null,
                    "avg_sale_price_usd": null,
                    "gross_units_sold": 1,
                    "gross_units_returned": 0,
                    "gross_units_activated": 1,
                    "net_units_sold": 1,
                    "gross_sales_usd": "19.99",
                    "gross_returns_usd": "0.00",
                    "net_sales_usd": "19.99",
                    "net_tax_usd": "0.00"
                }],
                "max_id": "0",
                "app_info": [{"id": "440", "name": "Example Game"}],
                "package_info": [],
                "bundle_info": [],
                "partner_info": [],
                "country_info": [{"id": "US", "name": "United States"}],
                "game_item_info": [],
                "combined_discount_info": []
            }
        })))
        .mount(&server)
        .await;

    let client = RemoteClient::new(server.uri());
    let cancel = CancellationToken::new();

    let page = client.detailed_sales("key", "2026-01-15", 0, &cancel).await.unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.app_info[0].name, "Example Game");
    assert_eq!(page.max_id, 0);
}
