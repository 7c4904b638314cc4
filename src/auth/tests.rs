//! Tests for the auth module

use super::*;
use crate::config::ClientOptions;
use crate::error::Error;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_config(server: &MockServer) -> OAuthConfig {
    OAuthConfig::new(format!("{}/oauth/token", server.uri()))
        .client_credentials("id", "secret")
        .retries(2, Duration::ZERO)
}

fn token_body(token: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 7200
    })
}

fn state_expiring_in(minutes: i64) -> TokenState {
    TokenState {
        access_token: "old-token".to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at: Utc::now() + ChronoDuration::minutes(minutes),
        token_type: "Bearer".to_string(),
    }
}

#[tokio::test]
async fn test_personal_access_token_credential() {
    let auth = PersonalAccessTokenAuthenticator::new("app", "secret");
    let credential = auth.credential().await.unwrap();

    assert_eq!(credential.scheme, AuthScheme::Basic);
    assert_eq!(credential.header_value(), "Basic YXBwOnNlY3JldA==");
}

#[tokio::test]
async fn test_client_credentials_grant() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("cc-token")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::new(oauth_config(&mock_server));
    let credential = auth.credential().await.unwrap();

    assert_eq!(credential.scheme, AuthScheme::Bearer);
    assert_eq!(credential.header_value(), "Bearer cc-token");

    let state = auth.token_state().await;
    assert_eq!(state.token_type, "bearer");
    assert!(state.expires_at > Utc::now() + ChronoDuration::minutes(119));
    assert!(auth.is_token_valid().await);
}

#[tokio::test]
async fn test_refresh_token_grant_preferred() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh",
            "refresh_token": "refresh-2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(1),
        reqwest::Client::new(),
    );

    assert_eq!(auth.access_token().await.unwrap(), "fresh");

    let state = auth.token_state().await;
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(state.token_type, "Bearer");
    // expires_in omitted: default lifetime applies
    let remaining = state.expires_at - Utc::now();
    assert!(remaining > ChronoDuration::minutes(59));
    assert!(remaining <= ChronoDuration::minutes(60));
}

#[tokio::test]
async fn test_refresh_keeps_previous_refresh_token_when_omitted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh")))
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(0),
        reqwest::Client::new(),
    );
    auth.access_token().await.unwrap();

    let state = auth.token_state().await;
    assert_eq!(state.access_token, "fresh");
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_token_expiring_in_four_minutes_is_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new-token")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(4),
        reqwest::Client::new(),
    );

    assert!(!auth.is_token_valid().await);
    assert_eq!(auth.access_token().await.unwrap(), "new-token");
}

#[tokio::test]
async fn test_token_expiring_in_six_minutes_is_reused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new-token")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(6),
        reqwest::Client::new(),
    );

    assert!(auth.is_token_valid().await);
    assert_eq!(auth.access_token().await.unwrap(), "old-token");
}

#[tokio::test]
async fn test_missing_access_token_clears_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "bearer"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    );

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::General { .. }));

    assert!(!auth.is_token_valid().await);
    let state = auth.token_state().await;
    assert!(state.access_token.is_empty());
    assert!(state.refresh_token.is_none());
    assert_eq!(state, TokenState::default());
}

#[tokio::test]
async fn test_out_of_range_expires_in_clears_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "t",
            "expires_in": 9_000_000_000_000_000_i64
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Arc::new(OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    ));

    let task = {
        let auth = Arc::clone(&auth);
        tokio::spawn(async move { auth.access_token().await })
    };
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::General { .. }));
    assert!(err.to_string().contains("expires_in"));

    assert_eq!(auth.token_state().await, TokenState::default());
}

#[tokio::test]
async fn test_non_positive_expires_in_is_already_stale() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "short-lived",
            "expires_in": -5
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::new(oauth_config(&mock_server));

    assert_eq!(auth.access_token().await.unwrap(), "short-lived");
    assert!(!auth.is_token_valid().await);
}

#[tokio::test]
async fn test_malformed_json_clears_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    );

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::General { .. }));
    assert!(auth.token_state().await.access_token.is_empty());
}

#[tokio::test]
async fn test_unauthorized_exchange_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    );

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert_eq!(err.context().unwrap().body, "invalid_grant");
    assert!(auth.token_state().await.refresh_token.is_none());
}

#[tokio::test]
async fn test_server_error_exhausts_refresh_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    );

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::Server { .. }));
    assert!(!auth.is_token_valid().await);
}

#[tokio::test]
async fn test_transient_failure_keeps_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("recovered")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::with_state(
        oauth_config(&mock_server),
        state_expiring_in(2),
        reqwest::Client::new(),
    );

    assert_eq!(auth.access_token().await.unwrap(), "recovered");
    assert_eq!(
        auth.token_state().await.refresh_token.as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn test_no_credentials_fails_without_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::new(OAuthConfig::new(format!(
        "{}/oauth/token",
        mock_server.uri()
    )));

    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("shared"))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Arc::new(OAuthAuthenticator::new(oauth_config(&mock_server)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }
}

#[tokio::test]
async fn test_refresh_notification() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("notified")))
        .mount(&mock_server)
        .await;

    let auth = OAuthAuthenticator::new(oauth_config(&mock_server));
    let mut events = auth.subscribe();

    auth.access_token().await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.access_token, "notified");
    assert!(event.reason.contains("client credentials"));
    assert_eq!(event.expires_at, auth.token_state().await.expires_at);
}

#[tokio::test]
async fn test_authenticator_from_options_pat() {
    let options = ClientOptions::builder()
        .personal_access_token("app", "secret")
        .client_credentials("id", "secret")
        .build();

    let auth = authenticator_from_options(&options, reqwest::Client::new()).unwrap();
    let credential = auth.credential().await.unwrap();
    assert_eq!(credential.scheme, AuthScheme::Basic);
}

#[tokio::test]
async fn test_authenticator_from_options_seeded_access_token() {
    let options = ClientOptions::builder().access_token("seeded").build();

    let auth = authenticator_from_options(&options, reqwest::Client::new()).unwrap();
    let credential = auth.credential().await.unwrap();
    assert_eq!(credential, Credential::bearer("seeded"));
}

#[test]
fn test_cleared_authenticator_reports_invalid_token() {
    tokio_test::block_on(async {
        let auth = OAuthAuthenticator::with_state(
            OAuthConfig::new("http://127.0.0.1:9/oauth/token"),
            TokenState::with_access_token("token", 3600),
            reqwest::Client::new(),
        );
        assert!(auth.is_token_valid().await);

        auth.clear().await;
        assert!(!auth.is_token_valid().await);
        tokio_test::assert_err!(auth.access_token().await);
    });
}
