//! OAuth authenticator
//!
//! Holds the access/refresh token pair and refreshes it lazily. The whole
//! read-or-refresh decision runs under one async mutex, so concurrent
//! callers never start parallel token exchanges and never observe a
//! half-updated token tuple.

use super::authenticator::Authenticator;
use super::types::{
    expiry_after, Credential, TokenRefreshed, TokenState, DEFAULT_EXPIRES_IN_SECONDS,
};
use crate::config::ClientOptions;
use crate::error::{Error, ErrorContext, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

const TOKEN_PATH: &str = "/oauth/token";

/// Settings for token exchanges
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Full URL of the token endpoint
    pub token_url: String,
    /// Application client id
    pub client_id: Option<String>,
    /// Application client secret
    pub client_secret: Option<String>,
    /// Attempts per exchange for transient failures (minimum 1)
    pub refresh_attempts: u32,
    /// Pause between exchange attempts
    pub retry_delay: Duration,
}

impl OAuthConfig {
    /// Create a config for a token endpoint
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: None,
            client_secret: None,
            refresh_attempts: 2,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Derive the config from client options
    pub fn from_options(options: &ClientOptions) -> Self {
        Self {
            token_url: format!("{}{TOKEN_PATH}", options.normalized_base_url()),
            client_id: options.client_id.clone(),
            client_secret: options.client_secret.clone(),
            refresh_attempts: options.token_refresh_attempts,
            retry_delay: options.retry_base_delay(),
        }
    }

    /// Set client credentials
    #[must_use]
    pub fn client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the exchange retry budget
    #[must_use]
    pub fn retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.refresh_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    fn client_pair(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Grant used for a token exchange
#[derive(Debug, Clone, PartialEq, Eq)]
enum Grant {
    RefreshToken(String),
    ClientCredentials,
}

impl Grant {
    fn form(&self) -> Vec<(&'static str, String)> {
        match self {
            Grant::RefreshToken(token) => vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", token.clone()),
            ],
            Grant::ClientCredentials => vec![("grant_type", "client_credentials".to_string())],
        }
    }

    fn reason(&self, had_token: bool) -> String {
        let why = if had_token {
            "access token near expiry"
        } else {
            "no access token"
        };
        match self {
            Grant::RefreshToken(_) => format!("{why}; refreshed with refresh token"),
            Grant::ClientCredentials => format!("{why}; obtained with client credentials"),
        }
    }
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth bearer-token authenticator
pub struct OAuthAuthenticator {
    config: OAuthConfig,
    state: Mutex<TokenState>,
    http_client: Client,
    events: broadcast::Sender<TokenRefreshed>,
}

impl OAuthAuthenticator {
    /// Create an authenticator with no token held
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_state(config, TokenState::default(), Client::new())
    }

    /// Create an authenticator seeded with token state
    pub fn with_state(config: OAuthConfig, state: TokenState, http_client: Client) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            config,
            state: Mutex::new(state),
            http_client,
            events,
        }
    }

    /// Subscribe to token refresh notifications
    pub fn subscribe(&self) -> broadcast::Receiver<TokenRefreshed> {
        self.events.subscribe()
    }

    /// A valid access token, refreshing first if it is missing or near expiry
    pub async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if !state.needs_refresh(Utc::now()) {
            return Ok(state.access_token.clone());
        }

        let grant = self.select_grant(&state)?;
        let had_token = !state.access_token.is_empty();
        debug!(token_url = %self.config.token_url, ?had_token, "Refreshing OAuth token");

        let outcome = match self.exchange_with_retry(&grant).await {
            Ok(response) => apply_response(&mut state, response, grant.reason(had_token)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(refreshed) => {
                info!(expires_at = %refreshed.expires_at, reason = %refreshed.reason, "OAuth token refreshed");
                let token = refreshed.access_token.clone();
                // No subscribers is fine
                let _ = self.events.send(refreshed);
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "OAuth token refresh failed, clearing token state");
                state.clear();
                Err(e)
            }
        }
    }

    /// Whether a usable, non-stale access token is held
    pub async fn is_token_valid(&self) -> bool {
        !self.state.lock().await.needs_refresh(Utc::now())
    }

    /// Snapshot of the current token state
    pub async fn token_state(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Replace the token state (e.g. after an out-of-band authorization)
    pub async fn set_token_state(&self, state: TokenState) {
        *self.state.lock().await = state;
    }

    /// Drop all tokens
    pub async fn clear(&self) {
        self.state.lock().await.clear();
    }

    fn select_grant(&self, state: &TokenState) -> Result<Grant> {
        if let Some(refresh) = state.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Grant::RefreshToken(refresh.clone()));
        }
        if self.config.client_pair().is_some() {
            return Ok(Grant::ClientCredentials);
        }
        Err(Error::auth(
            "cannot refresh access token: no refresh token or client credentials configured",
        ))
    }

    async fn exchange_with_retry(&self, grant: &Grant) -> Result<TokenResponse> {
        let attempts = self.config.refresh_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.exchange(grant).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.config.retry_delay * attempt;
                    warn!(
                        "Token exchange failed ({e}), attempt {attempt}/{attempts}, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn exchange(&self, grant: &Grant) -> Result<TokenResponse> {
        let mut req = self
            .http_client
            .post(&self.config.token_url)
            .form(&grant.form());
        if let Some((id, secret)) = self.config.client_pair() {
            req = req.basic_auth(id, Some(secret));
        }

        let response = req.send().await.map_err(Error::Http)?;
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            let context = ErrorContext::new("POST", TOKEN_PATH)
                .with_status(status.as_u16())
                .with_request_id(request_id)
                .with_body(body);
            return Err(match status.as_u16() {
                401 => Error::Authentication {
                    message: "token endpoint rejected the client or refresh token".to_string(),
                    context: Some(context),
                },
                s if s >= 500 => Error::Server {
                    context,
                    transient: true,
                },
                s => Error::Authentication {
                    message: format!("token exchange failed with status {s}"),
                    context: Some(context),
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::General {
            message: format!("malformed token response: {e}"),
            context: Some(
                ErrorContext::new("POST", TOKEN_PATH)
                    .with_status(status.as_u16())
                    .with_body(body.clone()),
            ),
        })
    }
}

fn apply_response(
    state: &mut TokenState,
    response: TokenResponse,
    reason: String,
) -> Result<TokenRefreshed> {
    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::general("token response is missing access_token"))?;

    let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);
    let expires_at = expiry_after(Utc::now(), expires_in)
        .ok_or_else(|| Error::general("token response has out-of-range expires_in"))?;

    state.access_token = access_token;
    if let Some(refresh) = response.refresh_token.filter(|t| !t.is_empty()) {
        state.refresh_token = Some(refresh);
    }
    state.expires_at = expires_at;
    state.token_type = response.token_type.unwrap_or_else(|| "Bearer".to_string());

    Ok(TokenRefreshed {
        access_token: state.access_token.clone(),
        expires_at: state.expires_at,
        reason,
    })
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    async fn credential(&self) -> Result<Credential> {
        self.access_token().await.map(Credential::bearer)
    }
}

impl std::fmt::Debug for OAuthAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAuthenticator")
            .field("token_url", &self.config.token_url)
            .field("has_client_credentials", &self.config.client_pair().is_some())
            .finish_non_exhaustive()
    }
}
