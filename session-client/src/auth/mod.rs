//! Authentication client abstraction.
//!
//! A session never talks to the authentication server itself. It hands its
//! refresh [`Credentials`] to an [`AuthClient`], which performs one network
//! round trip and answers with an access token or a rejection. Retrying is
//! the caller's business (see [`crate::retry`]).

mod mock;

pub use mock::{AuthCall, MockAuthClient};

use async_trait::async_trait;
use session_types::{AccessToken, Credentials};
use thiserror::Error;

/// Answer of the authentication server to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// An access token was issued.
    Granted(AccessToken),
    /// The server answered but did not issue a token.
    Rejected {
        /// Reason given by the server.
        reason: String,
    },
}

impl AuthResponse {
    /// Whether this response carries a token that can be used right now.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Granted(token) if token.is_valid())
    }
}

/// Authentication client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The request did not complete (timeout, unreachable host, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The credentials were permanently refused.
    #[error("credentials revoked: {0}")]
    Revoked(String),
}

impl AuthError {
    /// Whether asking again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Exchanges refresh credentials for access tokens.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Request an access token for `server_url` from the server at `auth_url`.
    async fn authenticate(
        &self,
        credentials: &Credentials,
        server_url: &str,
        auth_url: &str,
    ) -> Result<AuthResponse, AuthError>;
}
