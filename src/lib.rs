//! # Planning Center API client
//!
//! A typed, async client for the Planning Center REST (JSON:API) API.
//!
//! ## Features
//!
//! - **Query Builder**: Filters, operators, includes, sorting, sparse fieldsets
//! - **Pagination**: Bound pages that fetch their neighbours, full drains and lazy streams
//! - **Resilience**: Retries with capped exponential backoff and typed errors
//! - **Authentication**: Personal access tokens and OAuth with automatic refresh
//! - **Caching**: Optional in-memory cache for GET responses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pco_client::{ClientOptions, PcoClient, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = ClientOptions::builder()
//!         .personal_access_token("app_id", "secret")
//!         .build();
//!     let client = PcoClient::new(options)?;
//!
//!     let people = client
//!         .people("people")
//!         .filter("status", "active")
//!         .order_by("last_name")
//!         .all(&CancellationToken::new())
//!         .await?;
//!     println!("{} people", people.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            PcoClient / ResourceQuery (fluent facade)         │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────────┬─────────────────────┐
//! │    Query     │      ApiConnection      │     Pagination      │
//! ├──────────────┼─────────────────────────┼─────────────────────┤
//! │ where[...]   │ Retry + backoff         │ PagedResponse       │
//! │ include      │ Error classification    │ next/previous page  │
//! │ order        │ Cache read-through      │ get_all / streams   │
//! └──────────────┴────────────┬────────────┴─────────────────────┘
//!                             │
//!              ┌──────────────┴──────────────┐
//!              │ Auth: PAT (Basic) / OAuth    │
//!              └──────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client options
pub mod config;

/// Authentication implementations
pub mod auth;

/// API connection with retry and error classification
pub mod http;

/// Query parameter builder
pub mod query;

/// Paged responses and multi-page drains
pub mod pagination;

/// Response caching
pub mod cache;

/// High-level client and fluent queries
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::{PcoClient, ResourceQuery};
pub use config::ClientOptions;
pub use http::ApiConnection;
pub use pagination::{PagedResponse, PaginationOptions};
pub use query::{FilterOperator, QueryParameters};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
