//! Client configuration
//!
//! `ClientOptions` is the single configuration surface for the client.
//! It can be built in code, loaded from a YAML/JSON file, or read from
//! `PCO_*` environment variables, and must pass [`ClientOptions::validate`]
//! before a connection is created from it.

use crate::error::{Error, Result};
use crate::types::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Client Options
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Absolute http(s) base URL of the API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth application client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth application client secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// OAuth access token obtained out of band
    #[serde(default)]
    pub access_token: Option<String>,

    /// OAuth refresh token obtained out of band
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Personal access token in `app_id:secret` form
    #[serde(default)]
    pub personal_access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Ceiling for a single backoff delay, in milliseconds
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    /// Upper bound of the random jitter added to each backoff, in milliseconds
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter_ms: u64,

    /// Attempts at a token exchange before token state is cleared
    #[serde(default = "default_token_refresh_attempts")]
    pub token_refresh_attempts: u32,

    /// Enable the read-through response cache
    #[serde(default)]
    pub enable_caching: bool,

    /// Default cache entry lifetime in seconds
    #[serde(default = "default_cache_expiration")]
    pub default_cache_expiration_seconds: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Log full request and response bodies at debug level
    #[serde(default)]
    pub enable_detailed_logging: bool,

    /// Headers added to every request
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1000
}

fn default_max_retry_delay() -> u64 {
    30_000
}

fn default_retry_jitter() -> u64 {
    1000
}

fn default_token_refresh_attempts() -> u32 {
    2
}

fn default_cache_expiration() -> u64 {
    300
}

fn default_max_cache_size() -> u64 {
    1000
}

fn default_user_agent() -> String {
    format!("pco-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: None,
            client_secret: None,
            access_token: None,
            refresh_token: None,
            personal_access_token: None,
            request_timeout_seconds: default_request_timeout(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
            retry_jitter_ms: default_retry_jitter(),
            token_refresh_attempts: default_token_refresh_attempts(),
            enable_caching: false,
            default_cache_expiration_seconds: default_cache_expiration(),
            max_cache_size: default_max_cache_size(),
            user_agent: default_user_agent(),
            enable_detailed_logging: false,
            default_headers: BTreeMap::new(),
        }
    }
}

/// Which authentication scheme the options select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// HTTP Basic with `app_id:secret`
    PersonalAccessToken { app_id: String, secret: String },
    /// OAuth bearer tokens, refreshed on demand
    OAuth,
}

impl ClientOptions {
    /// Create a new options builder
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Load options from a YAML or JSON file (by extension)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    /// Read options from `PCO_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut options = Self::default();

        if let Some(url) = get("PCO_BASE_URL") {
            options.base_url = url;
        }
        options.client_id = get("PCO_CLIENT_ID");
        options.client_secret = get("PCO_CLIENT_SECRET");
        options.access_token = get("PCO_ACCESS_TOKEN");
        options.refresh_token = get("PCO_REFRESH_TOKEN");
        options.personal_access_token = get("PCO_PERSONAL_ACCESS_TOKEN");

        if let Some(attempts) = get("PCO_MAX_RETRY_ATTEMPTS").and_then(|v| v.parse().ok()) {
            options.max_retry_attempts = attempts;
        }
        if let Some(flag) = get("PCO_ENABLE_CACHING").and_then(|v| v.parse().ok()) {
            options.enable_caching = flag;
        }
        options
    }

    /// Check every field and the credential combination
    pub fn validate(&self) -> Result<()> {
        self.validate_transport()?;
        self.validate_credentials()
    }

    /// Check everything except credentials
    pub fn validate_transport(&self) -> Result<()> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("scheme must be http or https, got '{}'", url.scheme()),
            ));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::invalid_value("base_url", "must be an absolute URL"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "request_timeout_seconds",
                "must be greater than zero",
            ));
        }
        if self.max_cache_size == 0 {
            return Err(Error::invalid_value("max_cache_size", "must be greater than zero"));
        }
        if self.max_retry_delay_ms < self.retry_base_delay_ms {
            return Err(Error::invalid_value(
                "max_retry_delay_ms",
                "must not be smaller than retry_base_delay_ms",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::invalid_value("user_agent", "must not be empty"));
        }
        Ok(())
    }

    /// Check that one usable credential combination is configured
    pub fn validate_credentials(&self) -> Result<()> {
        match (&self.client_id, &self.client_secret) {
            (Some(_), None) => return Err(Error::invalid_value("client_secret", "required with client_id")),
            (None, Some(_)) => return Err(Error::invalid_value("client_id", "required with client_secret")),
            _ => {}
        }

        if let Some(pat) = &self.personal_access_token {
            split_personal_access_token(pat)?;
        }

        if !self.has_oauth_client() && self.access_token.is_none() && self.personal_access_token.is_none()
        {
            return Err(Error::config(
                "one of client_id/client_secret, access_token or personal_access_token is required",
            ));
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }

    /// Whether an OAuth client id and secret are both configured
    pub fn has_oauth_client(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Select the authentication scheme
    ///
    /// A personal access token takes precedence over OAuth settings.
    pub fn auth_mode(&self) -> Result<AuthMode> {
        if let Some(pat) = &self.personal_access_token {
            let (app_id, secret) = split_personal_access_token(pat)?;
            return Ok(AuthMode::PersonalAccessToken {
                app_id: app_id.to_string(),
                secret: secret.to_string(),
            });
        }
        Ok(AuthMode::OAuth)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn retry_jitter(&self) -> Duration {
        Duration::from_millis(self.retry_jitter_ms)
    }

    pub fn default_cache_expiration(&self) -> Duration {
        Duration::from_secs(self.default_cache_expiration_seconds)
    }
}

fn split_personal_access_token(pat: &str) -> Result<(&str, &str)> {
    match pat.split_once(':') {
        Some((app_id, secret)) if !app_id.is_empty() && !secret.is_empty() => Ok((app_id, secret)),
        _ => Err(Error::invalid_value(
            "personal_access_token",
            "expected 'app_id:secret'",
        )),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for client options
#[derive(Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    /// Use OAuth client credentials
    pub fn client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.options.client_id = Some(client_id.into());
        self.options.client_secret = Some(client_secret.into());
        self
    }

    /// Seed an OAuth access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.options.access_token = Some(token.into());
        self
    }

    /// Seed an OAuth refresh token
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.options.refresh_token = Some(token.into());
        self
    }

    /// Use a personal access token (`app_id`, `secret`)
    pub fn personal_access_token(mut self, app_id: &str, secret: &str) -> Self {
        self.options.personal_access_token = Some(format!("{app_id}:{secret}"));
        self
    }

    /// Set the request timeout, rounded up to whole seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout_seconds = whole_seconds_ceil(timeout);
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.options.max_retry_attempts = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, base: Duration, max: Duration, jitter: Duration) -> Self {
        self.options.retry_base_delay_ms = base.as_millis() as u64;
        self.options.max_retry_delay_ms = max.as_millis() as u64;
        self.options.retry_jitter_ms = jitter.as_millis() as u64;
        self
    }

    /// Set the token exchange attempt budget
    pub fn token_refresh_attempts(mut self, attempts: u32) -> Self {
        self.options.token_refresh_attempts = attempts;
        self
    }

    /// Enable the response cache; `expiration` is rounded up to whole seconds
    pub fn caching(mut self, expiration: Duration, max_size: u64) -> Self {
        self.options.enable_caching = true;
        self.options.default_cache_expiration_seconds = whole_seconds_ceil(expiration);
        self.options.max_cache_size = max_size;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.options.user_agent = agent.into();
        self
    }

    /// Log request and response bodies
    pub fn detailed_logging(mut self, enabled: bool) -> Self {
        self.options.enable_detailed_logging = enabled;
        self
    }

    /// Build the options without validating
    pub fn build(self) -> ClientOptions {
        self.options
    }
}

fn whole_seconds_ceil(duration: Duration) -> u64 {
    duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0))
}
