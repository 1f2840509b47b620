//! Error classification policy.
//!
//! Maps numeric error codes to the reaction a session should have. The
//! partition boundaries are configuration: the authentication server
//! contract decides which codes mean what, so nothing here is hard-coded
//! beyond the defaults.

use serde::Deserialize;
use session_types::ErrorCode;

/// What a session does with an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The session cannot continue and moves to Stopped.
    Fatal,
    /// The access token is no longer accepted; authenticate again.
    AuthExpired,
    /// Forwarded to the error handler only.
    ExternalOnly,
    /// Outside every reported range; no reaction.
    Ignorable,
}

/// An inclusive range of error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CodeRange {
    /// First code in the range.
    pub start: i32,
    /// Last code in the range (inclusive).
    pub end: i32,
}

impl CodeRange {
    /// Create an inclusive range.
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// A range holding exactly one code.
    pub const fn single(code: ErrorCode) -> Self {
        Self::new(code.value(), code.value())
    }

    /// Whether `code` falls within this range.
    pub fn contains(&self, code: ErrorCode) -> bool {
        (self.start..=self.end).contains(&code.value())
    }
}

/// Configurable partition of error codes into [`ErrorClass`]es.
///
/// Lookup order is auth-expired, fatal, reported; a code in none of them
/// is ignorable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorPolicy {
    /// Codes that trigger re-authentication.
    #[serde(default = "default_auth_expired")]
    pub auth_expired: Vec<CodeRange>,
    /// Codes that stop the session.
    #[serde(default = "default_fatal")]
    pub fatal: Vec<CodeRange>,
    /// Codes meaningful to the application but not to the state machine.
    #[serde(default = "default_reported")]
    pub reported: Vec<CodeRange>,
}

fn default_auth_expired() -> Vec<CodeRange> {
    vec![CodeRange::single(ErrorCode::TOKEN_EXPIRED)]
}

fn default_fatal() -> Vec<CodeRange> {
    vec![CodeRange::new(
        ErrorCode::BAD_AUTHENTICATION.value(),
        ErrorCode::PERMISSION_DENIED.value(),
    )]
}

fn default_reported() -> Vec<CodeRange> {
    vec![CodeRange::new(0, 99), CodeRange::new(200, 299)]
}

impl ErrorPolicy {
    /// Classify a code.
    pub fn classify(&self, code: ErrorCode) -> ErrorClass {
        let hit = |ranges: &[CodeRange]| ranges.iter().any(|r| r.contains(code));
        if hit(&self.auth_expired) {
            ErrorClass::AuthExpired
        } else if hit(&self.fatal) {
            ErrorClass::Fatal
        } else if hit(&self.reported) {
            ErrorClass::ExternalOnly
        } else {
            ErrorClass::Ignorable
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            auth_expired: default_auth_expired(),
            fatal: default_fatal(),
            reported: default_reported(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_classifies_well_known_codes() {
        let policy = ErrorPolicy::default();
        assert_eq!(
            policy.classify(ErrorCode::TOKEN_EXPIRED),
            ErrorClass::AuthExpired
        );
        assert_eq!(
            policy.classify(ErrorCode::BAD_AUTHENTICATION),
            ErrorClass::Fatal
        );
        assert_eq!(
            policy.classify(ErrorCode::PERMISSION_DENIED),
            ErrorClass::Fatal
        );
        assert_eq!(
            policy.classify(ErrorCode::SESSION_CLOSED),
            ErrorClass::ExternalOnly
        );
        assert_eq!(
            policy.classify(ErrorCode::IO_EXCEPTION),
            ErrorClass::ExternalOnly
        );
    }

    #[test]
    fn codes_outside_reported_ranges_are_ignorable() {
        let policy = ErrorPolicy::default();
        assert_eq!(
            policy.classify(ErrorCode::CONNECTION_CLOSED),
            ErrorClass::Ignorable
        );
        assert_eq!(policy.classify(ErrorCode::UNKNOWN), ErrorClass::Ignorable);
        assert_eq!(policy.classify(ErrorCode::new(300)), ErrorClass::Ignorable);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = CodeRange::new(200, 299);
        assert!(range.contains(ErrorCode::new(200)));
        assert!(range.contains(ErrorCode::new(299)));
        assert!(!range.contains(ErrorCode::new(300)));
        assert!(!range.contains(ErrorCode::new(199)));
    }

    #[test]
    fn auth_expired_wins_over_fatal() {
        let policy = ErrorPolicy {
            auth_expired: vec![CodeRange::single(ErrorCode::new(203))],
            fatal: vec![CodeRange::new(200, 299)],
            reported: vec![],
        };
        assert_eq!(policy.classify(ErrorCode::new(203)), ErrorClass::AuthExpired);
        assert_eq!(policy.classify(ErrorCode::new(204)), ErrorClass::Fatal);
    }

    #[test]
    fn policy_from_toml() {
        let toml = r#"
fatal = [{ start = 100, end = 199 }]
reported = []
"#;
        let policy: ErrorPolicy = toml::from_str(toml).unwrap();
        assert_eq!(
            policy.classify(ErrorCode::CONNECTION_CLOSED),
            ErrorClass::Fatal
        );
        // auth_expired keeps its default
        assert_eq!(
            policy.classify(ErrorCode::TOKEN_EXPIRED),
            ErrorClass::AuthExpired
        );
        assert_eq!(
            policy.classify(ErrorCode::SESSION_CLOSED),
            ErrorClass::Ignorable
        );
    }
}
