//! Error types for the Planning Center client
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! API failures are classified by HTTP status into distinct variants so
//! callers can branch on the kind of failure rather than on raw codes.
//! Every API variant carries an [`ErrorContext`] with the method, endpoint,
//! request id and raw body of the failed exchange.

use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Diagnostic context attached to every API error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// HTTP method of the failed request
    pub method: String,
    /// Endpoint path (without query string)
    pub endpoint: String,
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    /// Value of the `X-Request-Id` response header
    pub request_id: Option<String>,
    /// Raw response body
    pub body: String,
}

impl ErrorContext {
    /// Create a context for a request
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Attach the response status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Attach the raw response body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        if let Some(id) = &self.request_id {
            write!(f, " [request {id}]")?;
        }
        Ok(())
    }
}

/// Rate limit details reported by the server on a 429
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// How long the server asked us to wait
    pub retry_after: Option<Duration>,
    /// `X-PCO-API-Request-Rate-Limit`
    pub limit: Option<u32>,
    /// `X-PCO-API-Request-Rate-Count`
    pub count: Option<u32>,
    /// `X-PCO-API-Request-Rate-Period` in seconds
    pub period: Option<u32>,
    /// Every response header, verbatim
    pub headers: BTreeMap<String, String>,
}

impl RateLimitInfo {
    /// Build rate limit details from response headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_u32 = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u32>().ok())
        };

        let verbatim = headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        Self {
            retry_after: header_u32("retry-after").map(|s| Duration::from_secs(u64::from(s))),
            limit: header_u32("x-pco-api-request-rate-limit"),
            count: header_u32("x-pco-api-request-rate-count"),
            period: header_u32("x-pco-api-request-rate-period"),
            headers: verbatim,
        }
    }
}

/// The main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // API Errors (classified by status)
    // ============================================================================
    #[error("Resource not found: {context}")]
    NotFound { context: ErrorContext },

    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Not authorized: {context}")]
    Authorization { context: ErrorContext },

    #[error("Rate limited: {context}")]
    RateLimit {
        info: RateLimitInfo,
        context: ErrorContext,
    },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Server error: {context}")]
    Server {
        context: ErrorContext,
        transient: bool,
    },

    #[error("{message}")]
    General {
        message: String,
        context: Option<ErrorContext>,
    },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Operation cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error without request context
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            context: None,
        }
    }

    /// Create an input validation error without request context
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: None,
        }
    }

    /// Create a general error without request context
    pub fn general(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
            context: None,
        }
    }

    /// Classify a non-success response into an error
    pub fn from_status(status: u16, headers: &HeaderMap, context: ErrorContext) -> Self {
        let context = context.with_status(status);
        match status {
            404 => Self::NotFound { context },
            401 => Self::Authentication {
                message: format!("credential rejected by {context}"),
                context: Some(context),
            },
            403 => Self::Authorization { context },
            429 => Self::RateLimit {
                info: RateLimitInfo::from_headers(headers),
                context,
            },
            400 | 422 => Self::Validation {
                message: format!("request rejected by {context}: {}", context.body),
                context: Some(context),
            },
            s if s >= 500 => Self::Server {
                context,
                transient: true,
            },
            s => Self::General {
                message: format!("Unexpected status {s} from {context}"),
                context: Some(context),
            },
        }
    }

    /// Check if this error may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Server { transient, .. } => *transient,
            Error::RateLimit { .. } => true,
            Error::Http(e) => !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }

    /// Diagnostic context, if this error came from an API exchange
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::NotFound { context }
            | Error::Authorization { context }
            | Error::RateLimit { context, .. }
            | Error::Server { context, .. } => Some(context),
            Error::Authentication { context, .. }
            | Error::Validation { context, .. }
            | Error::General { context, .. } => context.as_ref(),
            _ => None,
        }
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        self.context().and_then(|c| c.status)
    }

    /// Server-provided delay before retrying, for rate limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { info, .. } => info.retry_after,
            _ => None,
        }
    }
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use test_case::test_case;

    fn ctx() -> ErrorContext {
        ErrorContext::new("GET", "/people/v2/people").with_body("{}")
    }

    #[test_case(404, "NotFound" ; "not found")]
    #[test_case(401, "Authentication" ; "unauthorized")]
    #[test_case(403, "Authorization" ; "forbidden")]
    #[test_case(429, "RateLimit" ; "too many requests")]
    #[test_case(400, "Validation" ; "bad request")]
    #[test_case(422, "Validation" ; "unprocessable")]
    #[test_case(500, "Server" ; "internal error")]
    #[test_case(503, "Server" ; "unavailable")]
    #[test_case(418, "General" ; "teapot")]
    fn test_from_status(status: u16, expected: &str) {
        let err = Error::from_status(status, &HeaderMap::new(), ctx());
        let kind = match err {
            Error::NotFound { .. } => "NotFound",
            Error::Authentication { .. } => "Authentication",
            Error::Authorization { .. } => "Authorization",
            Error::RateLimit { .. } => "RateLimit",
            Error::Validation { .. } => "Validation",
            Error::Server { .. } => "Server",
            Error::General { .. } => "General",
            _ => "other",
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::from_status(500, &HeaderMap::new(), ctx()).is_transient());
        assert!(Error::from_status(429, &HeaderMap::new(), ctx()).is_transient());

        assert!(!Error::from_status(400, &HeaderMap::new(), ctx()).is_transient());
        assert!(!Error::from_status(401, &HeaderMap::new(), ctx()).is_transient());
        assert!(!Error::from_status(404, &HeaderMap::new(), ctx()).is_transient());
        assert!(!Error::Cancelled.is_transient());
        assert!(!Error::config("test").is_transient());
        assert!(!Error::Server {
            context: ctx(),
            transient: false
        }
        .is_transient());
    }

    #[test]
    fn test_context_is_attached() {
        let context = ctx().with_request_id(Some("req-1".to_string()));
        let err = Error::from_status(403, &HeaderMap::new(), context);

        let attached = err.context().unwrap();
        assert_eq!(attached.method, "GET");
        assert_eq!(attached.endpoint, "/people/v2/people");
        assert_eq!(attached.request_id.as_deref(), Some("req-1"));
        assert_eq!(attached.body, "{}");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("12"));
        headers.insert("x-pco-api-request-rate-limit", HeaderValue::from_static("100"));
        headers.insert("x-pco-api-request-rate-period", HeaderValue::from_static("20"));

        let err = Error::from_status(429, &headers, ctx());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        if let Error::RateLimit { info, .. } = err {
            assert_eq!(info.limit, Some(100));
            assert_eq!(info.period, Some(20));
            assert_eq!(info.count, None);
            assert_eq!(info.headers.get("retry-after").map(String::as_str), Some("12"));
        } else {
            panic!("Expected RateLimit");
        }
    }

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::from_status(
            404,
            &HeaderMap::new(),
            ctx().with_request_id(Some("abc".to_string())),
        );
        assert_eq!(
            err.to_string(),
            "Resource not found: GET /people/v2/people (HTTP 404) [request abc]"
        );
    }
}
