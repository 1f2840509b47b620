//! Access tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock is set before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A short-lived token authorizing a bind to one remote target.
///
/// The value is opaque to this crate. A token whose expiry is at or
/// before "now" is treated as absent when deciding whether a bind needs
/// a fresh authentication round trip.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken {
    value: String,
    /// Expiry in milliseconds since the Unix epoch.
    expires_at: u64,
}

impl AccessToken {
    /// Create a token from its opaque value and absolute expiry (ms since epoch).
    pub fn new(value: impl Into<String>, expires_at: u64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Create a token that expires `ttl` from now.
    pub fn expiring_in(value: impl Into<String>, ttl: Duration) -> Self {
        let expires_at = now_millis().saturating_add(ttl.as_millis() as u64);
        Self::new(value, expires_at)
    }

    /// The opaque token value handed to the transport.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiry in milliseconds since the Unix epoch.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Whether the token is still usable at `now_ms`.
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        !self.value.is_empty() && self.expires_at > now_ms
    }

    /// Whether the token is still usable right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &format!("[{} bytes REDACTED]", self.value.len()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
