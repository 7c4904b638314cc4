//! Client facade
//!
//! `PcoClient` owns an [`ApiConnection`] and offers typed entry points per
//! product module:
//!
//! ```rust,ignore
//! let client = PcoClient::new(ClientOptions::from_env())?;
//! let people = client
//!     .people("people")
//!     .filter("status", "active")
//!     .include("emails")
//!     .per_page(50)
//!     .all(&CancellationToken::new())
//!     .await?;
//! ```

mod query;

pub use query::ResourceQuery;

use crate::config::ClientOptions;
use crate::error::Result;
use crate::http::ApiConnection;
use crate::types::{CurrentUser, CurrentUserAttributes, JsonValue, Module};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Endpoint requested by [`PcoClient::health_check`]
const HEALTH_ENDPOINT: &str = "/people/v2";

/// Endpoint describing the authenticated person
const CURRENT_USER_ENDPOINT: &str = "/people/v2/me";

/// High-level client
#[derive(Debug, Clone)]
pub struct PcoClient {
    connection: ApiConnection,
}

impl PcoClient {
    /// Build a client from options
    pub fn new(options: ClientOptions) -> Result<Self> {
        Ok(Self {
            connection: ApiConnection::new(options)?,
        })
    }

    /// Wrap an existing connection
    pub fn from_connection(connection: ApiConnection) -> Self {
        Self { connection }
    }

    /// Underlying connection
    pub fn connection(&self) -> &ApiConnection {
        &self.connection
    }

    /// Query a resource under a module with untyped attributes
    pub fn module(&self, module: Module, resource: &str) -> ResourceQuery<JsonValue> {
        self.resource(module.path(resource))
    }

    /// Query a resource by full endpoint path
    pub fn resource<A: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: impl Into<String>,
    ) -> ResourceQuery<A> {
        ResourceQuery::new(self.connection.clone(), endpoint)
    }

    /// Query a People resource
    pub fn people(&self, resource: &str) -> ResourceQuery<JsonValue> {
        self.module(Module::People, resource)
    }

    /// Query a Services resource
    pub fn services(&self, resource: &str) -> ResourceQuery<JsonValue> {
        self.module(Module::Services, resource)
    }

    /// Query a Giving resource
    pub fn giving(&self, resource: &str) -> ResourceQuery<JsonValue> {
        self.module(Module::Giving, resource)
    }

    /// Query a Groups resource
    pub fn groups(&self, resource: &str) -> ResourceQuery<JsonValue> {
        self.module(Module::Groups, resource)
    }

    /// Whether the API is reachable with the configured credentials
    ///
    /// Never fails; any error is logged and reported as `false`.
    pub async fn health_check(&self) -> bool {
        match self.connection.get::<JsonValue>(HEALTH_ENDPOINT).await {
            Ok(_) => {
                debug!("Health check succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// The authenticated person, or a placeholder when it cannot be resolved
    pub async fn current_user(&self) -> CurrentUser {
        match self
            .connection
            .get_resource::<CurrentUserAttributes>(CURRENT_USER_ENDPOINT)
            .await
        {
            Ok(resource) => resource.into(),
            Err(e) => {
                warn!(error = %e, "Could not resolve current user");
                CurrentUser::placeholder()
            }
        }
    }
}
