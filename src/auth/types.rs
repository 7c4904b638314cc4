//! Auth value types
//!
//! These types describe credentials handed to the HTTP layer and the
//! mutable OAuth token tuple kept inside the authenticator.

use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};

/// Tokens expiring within this window are treated as stale
pub const REFRESH_WINDOW_SECONDS: i64 = 300;

/// Token lifetime assumed when the server omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

/// Authorization scheme of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: Basic <base64>`
    Basic,
}

/// A ready-to-send credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Scheme to send the value with
    pub scheme: AuthScheme,
    /// Token (bearer) or base64 user:pass (basic)
    pub value: String,
}

impl Credential {
    /// A bearer credential
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            value: token.into(),
        }
    }

    /// A basic credential from a user name and password
    pub fn basic(username: &str, password: &str) -> Self {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        Self {
            scheme: AuthScheme::Basic,
            value: encoded,
        }
    }

    /// Full `Authorization` header value
    pub fn header_value(&self) -> String {
        match self.scheme {
            AuthScheme::Bearer => format!("Bearer {}", self.value),
            AuthScheme::Basic => format!("Basic {}", self.value),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// OAuth token tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    /// Current access token, empty when none is held
    pub access_token: String,
    /// Refresh token, if one was issued
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// Token type reported by the server
    pub token_type: String,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: None,
            expires_at: DateTime::<Utc>::MIN_UTC,
            token_type: "Bearer".to_string(),
        }
    }
}

impl TokenState {
    /// Seed state with an access token that expires in `seconds`
    pub fn with_access_token(token: impl Into<String>, seconds: i64) -> Self {
        Self {
            access_token: token.into(),
            expires_at: expiry_after(Utc::now(), seconds).unwrap_or(DateTime::<Utc>::MAX_UTC),
            ..Default::default()
        }
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Whether a refresh is due at `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self.expires_at <= now + Duration::seconds(REFRESH_WINDOW_SECONDS)
    }

    /// Drop every token so the next call starts from scratch
    pub fn clear(&mut self) {
        self.access_token.clear();
        self.refresh_token = None;
        self.expires_at = DateTime::<Utc>::MIN_UTC;
    }
}

/// Instant `seconds` after `now`, or `None` when it does not fit a `DateTime`.
/// Zero and negative lifetimes are already expired.
pub(crate) fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return Some(now);
    }
    Duration::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta))
}

/// Notification sent after every successful token exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRefreshed {
    /// The new access token
    pub access_token: String,
    /// When it expires
    pub expires_at: DateTime<Utc>,
    /// Human-readable reason for the refresh
    pub reason: String,
}
