//! Error types for syncbind.

use crate::ErrorCode;
use thiserror::Error;

/// Errors that end a session or an authentication sequence.
///
/// These are what the session reports to the application's error handler
/// when it gives up on something; they never escape the public API as
/// `Result`s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The transport reported an error code.
    #[error("transport error {code}: {message}")]
    Transport {
        /// Code reported by the transport.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },

    /// Authentication gave up.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No valid access token is available for the target.
    #[error("no valid access token for {0}")]
    MissingAccessToken(String),

    /// The transport handle has already been closed.
    #[error("transport handle closed")]
    HandleClosed,

    /// The session is stopped and cannot be used again.
    #[error("session stopped")]
    Stopped,
}

impl SessionError {
    /// The error code reported to error handlers for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport { code, .. } => *code,
            Self::AuthenticationFailed(_) => ErrorCode::BAD_AUTHENTICATION,
            Self::MissingAccessToken(_) => ErrorCode::TOKEN_EXPIRED,
            Self::HandleClosed => ErrorCode::IO_EXCEPTION,
            Self::Stopped => ErrorCode::SESSION_CLOSED,
        }
    }
}
