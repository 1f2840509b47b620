//! Identity shared by sessions.
//!
//! An identity couples the refresh credentials, the authentication server
//! they are valid for and the access tokens obtained with them. Several
//! sessions (one per target) may share one identity through an `Arc`.

use crate::token_store::AccessTokenStore;
use session_types::{AccessToken, Credentials};
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Credentials, authentication server and access tokens of one user.
pub struct Identity {
    credentials: RwLock<Credentials>,
    auth_url: String,
    tokens: AccessTokenStore,
}

impl Identity {
    /// Create an identity with an empty token store.
    pub fn new(credentials: Credentials, auth_url: impl Into<String>) -> Self {
        Self::with_token_store(credentials, auth_url, AccessTokenStore::new())
    }

    /// Create an identity backed by an existing token store.
    pub fn with_token_store(
        credentials: Credentials,
        auth_url: impl Into<String>,
        tokens: AccessTokenStore,
    ) -> Self {
        Self {
            credentials: RwLock::new(credentials),
            auth_url: auth_url.into(),
            tokens,
        }
    }

    /// A copy of the current credentials.
    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the credentials. Stored access tokens are kept.
    pub fn set_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    /// URL of the authentication server.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// The token store.
    pub fn tokens(&self) -> &AccessTokenStore {
        &self.tokens
    }

    /// The non-expired access token for `target`, if any.
    pub fn access_token(&self, target: &str) -> Option<AccessToken> {
        self.tokens.valid(target)
    }

    /// Store an access token for `target`.
    pub fn set_access_token(&self, target: &str, token: AccessToken) {
        self.tokens.set(target, token);
    }

    /// Whether a non-expired access token exists for `target`.
    pub fn is_authenticated(&self, target: &str) -> bool {
        self.tokens.is_valid(target)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("auth_url", &self.auth_url)
            .field("targets", &self.tokens.len())
            .finish_non_exhaustive()
    }
}
