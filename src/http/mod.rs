//! HTTP connection module
//!
//! Provides the API connection with retry, backoff and error classification.
//!
//! # Features
//!
//! - **Automatic Retries**: Transient failures retried with capped exponential backoff
//! - **Error Classification**: Status codes mapped to typed errors with request context
//! - **Authentication**: Credential injection from the auth module
//! - **Caching**: Optional read-through cache for GET requests

mod client;
mod retry;

pub use client::{ApiConnection, ApiConnectionBuilder};
pub use retry::RetryPolicy;
