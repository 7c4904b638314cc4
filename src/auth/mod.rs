//! Authentication module
//!
//! Supports: Personal Access Token (HTTP Basic) and OAuth (Bearer)
//!
//! The HTTP layer asks an `Authenticator` for a `Credential` before every
//! request. `OAuthAuthenticator` manages token refresh; the personal access
//! token variant never refreshes.

mod authenticator;
mod oauth;
mod types;

pub use authenticator::{
    authenticator_from_options, Authenticator, PersonalAccessTokenAuthenticator,
};
pub use oauth::{OAuthAuthenticator, OAuthConfig};
pub use types::{
    AuthScheme, Credential, TokenRefreshed, TokenState, DEFAULT_EXPIRES_IN_SECONDS,
    REFRESH_WINDOW_SECONDS,
};

#[cfg(test)]
mod tests;
