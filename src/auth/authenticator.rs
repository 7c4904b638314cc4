//! Authenticator trait and the personal access token implementation
//!
//! The HTTP layer asks an [`Authenticator`] for a [`Credential`] before
//! every request and sends it according to its [`AuthScheme`].

use super::oauth::{OAuthAuthenticator, OAuthConfig};
use super::types::{Credential, TokenState, DEFAULT_EXPIRES_IN_SECONDS};
use crate::config::{AuthMode, ClientOptions};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Produces a valid credential on demand
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Current credential, refreshing it first if needed
    async fn credential(&self) -> Result<Credential>;
}

/// Personal access token (`app_id:secret` over HTTP Basic)
pub struct PersonalAccessTokenAuthenticator {
    credential: Credential,
}

impl PersonalAccessTokenAuthenticator {
    /// Create an authenticator for an application id and secret
    pub fn new(app_id: &str, secret: &str) -> Self {
        Self {
            credential: Credential::basic(app_id, secret),
        }
    }
}

#[async_trait]
impl Authenticator for PersonalAccessTokenAuthenticator {
    async fn credential(&self) -> Result<Credential> {
        Ok(self.credential.clone())
    }
}

impl std::fmt::Debug for PersonalAccessTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonalAccessTokenAuthenticator")
            .finish_non_exhaustive()
    }
}

/// Build the authenticator selected by `options`
///
/// An access token supplied out of band is assumed to carry the default
/// lifetime from the moment the client is created.
pub fn authenticator_from_options(
    options: &ClientOptions,
    http_client: Client,
) -> Result<Arc<dyn Authenticator>> {
    match options.auth_mode()? {
        AuthMode::PersonalAccessToken { app_id, secret } => {
            Ok(Arc::new(PersonalAccessTokenAuthenticator::new(&app_id, &secret)))
        }
        AuthMode::OAuth => {
            let mut state = match &options.access_token {
                Some(token) => TokenState::with_access_token(token, DEFAULT_EXPIRES_IN_SECONDS),
                None => TokenState::default(),
            };
            state.refresh_token.clone_from(&options.refresh_token);

            let config = OAuthConfig::from_options(options);
            Ok(Arc::new(OAuthAuthenticator::with_state(
                config,
                state,
                http_client,
            )))
        }
    }
}
