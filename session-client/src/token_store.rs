//! Access token store.
//!
//! Holds the current access token per target (server URL). Clones share
//! the same map, so every session of an identity sees the same tokens.

use dashmap::DashMap;
use session_types::AccessToken;
use std::sync::Arc;

/// Thread-safe map from target to its current access token.
#[derive(Debug, Clone, Default)]
pub struct AccessTokenStore {
    tokens: Arc<DashMap<String, AccessToken>>,
}

impl AccessTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The token stored for `target`, expired or not.
    pub fn get(&self, target: &str) -> Option<AccessToken> {
        self.tokens.get(target).map(|entry| entry.value().clone())
    }

    /// The token stored for `target` if it has not expired.
    pub fn valid(&self, target: &str) -> Option<AccessToken> {
        self.get(target).filter(AccessToken::is_valid)
    }

    /// Store `token` for `target`, replacing any previous one.
    pub fn set(&self, target: impl Into<String>, token: AccessToken) {
        self.tokens.insert(target.into(), token);
    }

    /// Forget the token for `target`.
    pub fn remove(&self, target: &str) -> Option<AccessToken> {
        self.tokens.remove(target).map(|(_, token)| token)
    }

    /// Whether a non-expired token exists for `target`.
    pub fn is_valid(&self, target: &str) -> bool {
        self.tokens
            .get(target)
            .is_some_and(|entry| entry.value().is_valid())
    }

    /// Number of targets with a stored token.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is stored.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
