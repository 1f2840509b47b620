//! Numeric error codes reported by the transport layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An error code delivered by the transport or synthesized by a session.
///
/// The value space is partitioned into ranges: `0..=99` are client-side
/// failures, `100..=199` are connection-level protocol errors and
/// `200..=299` are session-level errors. What a session does with a code
/// is decided by its error policy, not by this type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// Unknown error.
    pub const UNKNOWN: ErrorCode = ErrorCode(-1);
    /// Local I/O failure.
    pub const IO_EXCEPTION: ErrorCode = ErrorCode(0);
    /// Connection closed by the server.
    pub const CONNECTION_CLOSED: ErrorCode = ErrorCode(100);
    /// Unspecified connection-level error.
    pub const OTHER_ERROR: ErrorCode = ErrorCode(101);
    /// Session closed by the server.
    pub const SESSION_CLOSED: ErrorCode = ErrorCode(200);
    /// Unspecified session-level error.
    pub const OTHER_SESSION_ERROR: ErrorCode = ErrorCode(201);
    /// The access token has expired.
    pub const TOKEN_EXPIRED: ErrorCode = ErrorCode(202);
    /// The access token was rejected.
    pub const BAD_AUTHENTICATION: ErrorCode = ErrorCode(203);
    /// The remote path is not valid.
    pub const ILLEGAL_PATH: ErrorCode = ErrorCode(204);
    /// The remote path does not exist.
    pub const NO_SUCH_PATH: ErrorCode = ErrorCode(205);
    /// The identity lacks permission for the remote path.
    pub const PERMISSION_DENIED: ErrorCode = ErrorCode(206);

    /// Wrap a raw code.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw numeric value.
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// Symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::UNKNOWN => "unknown",
            Self::IO_EXCEPTION => "io_exception",
            Self::CONNECTION_CLOSED => "connection_closed",
            Self::OTHER_ERROR => "other_error",
            Self::SESSION_CLOSED => "session_closed",
            Self::OTHER_SESSION_ERROR => "other_session_error",
            Self::TOKEN_EXPIRED => "token_expired",
            Self::BAD_AUTHENTICATION => "bad_authentication",
            Self::ILLEGAL_PATH => "illegal_path",
            Self::NO_SUCH_PATH => "no_such_path",
            Self::PERMISSION_DENIED => "permission_denied",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i32> for ErrorCode {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorCode({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_codes_have_names() {
        assert_eq!(ErrorCode::TOKEN_EXPIRED.name(), Some("token_expired"));
        assert_eq!(ErrorCode::new(206).name(), Some("permission_denied"));
    }

    #[test]
    fn unknown_codes_display_raw_value() {
        assert_eq!(ErrorCode::new(4242).to_string(), "4242");
        assert_eq!(ErrorCode::TOKEN_EXPIRED.to_string(), "token_expired (202)");
    }

    #[test]
    fn error_code_serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::BAD_AUTHENTICATION).unwrap();
        assert_eq!(json, "203");
    }
}
