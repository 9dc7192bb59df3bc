#![allow(clippy::unwrap_used)]
// Integration tests for `RecordsClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulseboard_api::{Error, RecordsClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RecordsClient) {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/api/data/", server.uri())).unwrap();
    let client = RecordsClient::with_client(reqwest::Client::new(), url);
    (server, client)
}

// ── Listing tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_plain_listing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "instrument": "EDF", "quantity": 200.0, "initial_price": 222.0 },
            { "id": 1, "instrument": "BNP", "quantity": 100.0, "initial_price": 99.0 }
        ])))
        .mount(&server)
        .await;

    let rows = client.fetch_page(50).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], 2);
    assert_eq!(rows[1]["instrument"], "BNP");
}

#[tokio::test]
async fn test_fetch_paginated_listing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            "previous": null,
            "results": [{ "id": 3 }, { "id": 2 }, { "id": 1 }]
        })))
        .mount(&server)
        .await;

    let rows = client.fetch_page(50).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["id"], 1);
}

#[tokio::test]
async fn test_fetch_truncates_to_limit() {
    let (server, client) = setup().await;

    let body: Vec<_> = (0..20).rev().map(|id| json!({ "id": id })).collect();
    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let rows = client.fetch_page(5).await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["id"], 19);
}

#[tokio::test]
async fn test_fetch_forbidden() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client.fetch_page(50).await.unwrap_err();
    assert!(err.is_unauthorized());
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "Forbidden");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_garbage_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let result = client.fetch_page(50).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;

    let transport = TransportConfig::default()
        .with_session_cookie(SecretString::from("sessionid=abc123".to_string()));
    let url = Url::parse(&format!("{}/api/data/", server.uri())).unwrap();
    let client = RecordsClient::new(url, &transport).unwrap();

    let rows = client.fetch_page(50).await.unwrap();
    assert_eq!(rows.len(), 1);
}
