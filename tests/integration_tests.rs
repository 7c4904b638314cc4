//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: options file → authentication → HTTP
//! requests → typed pages and drains

use futures::StreamExt;
use pco_client::auth::{OAuthAuthenticator, OAuthConfig, TokenState};
use pco_client::http::{ApiConnection, RetryPolicy};
use pco_client::{ClientOptions, Error, FilterOperator, PaginationOptions, PcoClient};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Song {
    title: String,
}

fn song(id: u32, title: &str) -> serde_json::Value {
    json!({"id": id.to_string(), "type": "Song", "attributes": {"title": title}})
}

// ============================================================================
// Options file → client
// ============================================================================

#[tokio::test]
async fn test_client_from_yaml_options_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/v2/songs"))
        .and(header("authorization", "Basic YXBwOnNlY3JldA=="))
        .and(header("x-app-name", "integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [song(1, "Amazing Grace")],
            "meta": {"total_count": 1, "count": 1, "per_page": 25, "offset": 0}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "base_url: {}\npersonal_access_token: \"app:secret\"\nmax_retry_attempts: 0\ndefault_headers:\n  X-App-Name: integration",
        mock_server.uri()
    )
    .unwrap();

    let options = ClientOptions::from_file(file.path()).unwrap();
    let client = PcoClient::new(options).unwrap();

    let songs = client
        .resource::<Song>("/services/v2/songs")
        .all(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].attributes.title, "Amazing Grace");
}

// ============================================================================
// OAuth end to end
// ============================================================================

#[tokio::test]
async fn test_oauth_refresh_then_api_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "rotated-refresh",
            "expires_in": 7200,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people/v2/people"))
        .and(header("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .client_credentials("id", "secret")
        .refresh_token("stored-refresh")
        .build();
    let client = PcoClient::new(options).unwrap();

    for _ in 0..3 {
        let page = client.people("people").fetch().await.unwrap();
        assert!(page.is_empty());
    }
}

#[tokio::test]
async fn test_oauth_failure_surfaces_before_any_api_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .client_credentials("id", "wrong")
        .build();
    let client = PcoClient::new(options).unwrap();

    let err = client.people("people").fetch().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_custom_oauth_authenticator_with_seeded_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/giving/v2/donations"))
        .and(header("authorization", "Bearer seeded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = OAuthConfig::new(format!("{}/oauth/token", mock_server.uri()));
    let auth = OAuthAuthenticator::with_state(
        config,
        TokenState::with_access_token("seeded", 3600),
        reqwest::Client::new(),
    );

    let connection = ApiConnection::builder(ClientOptions::builder().base_url(mock_server.uri()).build())
        .authenticator(Arc::new(auth))
        .build()
        .unwrap();
    let client = PcoClient::from_connection(connection);

    let page = client.giving("donations").fetch().await.unwrap();
    assert!(page.is_empty());
}

// ============================================================================
// Pagination end to end
// ============================================================================

async fn mount_songs(mock_server: &MockServer) {
    for (offset, ids, next) in [(0u32, [1u32, 2], true), (2, [3, 4], true), (4, [5, 6], false)] {
        let mut links = json!({"self": "https://example.com/self"});
        if next {
            links["next"] = json!("https://example.com/next");
        }
        let body = json!({
            "data": ids.iter().map(|id| song(*id, &format!("Song {id}"))).collect::<Vec<_>>(),
            "meta": {"total_count": 6, "count": 2, "per_page": 2, "offset": offset},
            "links": links
        });

        let matcher = Mock::given(method("GET"))
            .and(path("/services/v2/songs"))
            .and(query_param("per_page", "2"))
            .and(query_param("where[title][contains]", "Song"));
        let (matcher, priority) = if offset == 0 {
            (matcher, 5)
        } else {
            (matcher.and(query_param("offset", offset.to_string())), 1)
        };
        matcher
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .with_priority(priority)
            .mount(mock_server)
            .await;
    }
}

#[tokio::test]
async fn test_paginated_drain_with_filters() {
    let mock_server = MockServer::start().await;
    mount_songs(&mock_server).await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .personal_access_token("app", "secret")
        .build();
    let client = PcoClient::new(options).unwrap();

    let titles: Vec<String> = client
        .resource::<Song>("/services/v2/songs")
        .filter_op("title", FilterOperator::Contains, "Song")
        .per_page(2)
        .all(&CancellationToken::new())
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.attributes.title)
        .collect();

    assert_eq!(
        titles,
        vec!["Song 1", "Song 2", "Song 3", "Song 4", "Song 5", "Song 6"]
    );
}

#[tokio::test]
async fn test_speed_optimized_stream_with_cap() {
    let mock_server = MockServer::start().await;
    mount_songs(&mock_server).await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .personal_access_token("app", "secret")
        .build();
    let client = PcoClient::new(options).unwrap();

    let streamed: Vec<String> = client
        .resource::<Song>("/services/v2/songs")
        .filter_op("title", FilterOperator::Contains, "Song")
        .pagination(PaginationOptions::speed_optimized().max_items(3))
        .per_page(2)
        .stream(CancellationToken::new())
        .map(|s| s.unwrap().attributes.title)
        .collect()
        .await;

    assert_eq!(streamed, vec!["Song 1", "Song 2", "Song 3"]);
}

#[tokio::test]
async fn test_navigation_from_typed_page() {
    let mock_server = MockServer::start().await;
    mount_songs(&mock_server).await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .personal_access_token("app", "secret")
        .build();
    let client = PcoClient::new(options).unwrap();

    let first = client
        .resource::<Song>("/services/v2/songs")
        .filter_op("title", FilterOperator::Contains, "Song")
        .per_page(2)
        .fetch()
        .await
        .unwrap();
    assert!(first.meta().is_first_page());

    let second = first.next_page().await.unwrap().unwrap();
    assert_eq!(second.meta().offset, 2);
    assert_eq!(second.data()[0].attributes.title, "Song 3");

    let third = second.next_page().await.unwrap().unwrap();
    assert!(!third.has_next_page());
    assert!(third.next_page().await.unwrap().is_none());
}

// ============================================================================
// Resilience
// ============================================================================

#[tokio::test]
async fn test_retry_budget_with_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/check-ins/v2/events"))
        .respond_with(ResponseTemplate::new(502).insert_header("x-request-id", "gw-1"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let options = ClientOptions::builder()
        .base_url(mock_server.uri())
        .personal_access_token("app", "secret")
        .build();
    let connection = ApiConnection::builder(options)
        .retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            jitter: Duration::from_millis(1),
        })
        .build()
        .unwrap();

    let err = connection
        .get::<serde_json::Value>("/check-ins/v2/events")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.status(), Some(502));
    assert_eq!(
        err.context().and_then(|c| c.request_id.as_deref()),
        Some("gw-1")
    );
}
