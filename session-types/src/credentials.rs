//! Credentials exchanged with the authentication server.
//!
//! A [`Credentials`] value is the long-lived refresh credential a session
//! hands to the authentication client in exchange for an [`AccessToken`].
//! It can come from a previous login (a refresh token) or directly from a
//! third-party login provider.
//!
//! [`AccessToken`]: crate::AccessToken

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// How a set of credentials was obtained.
///
/// The authentication server uses this to decide how to validate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    /// Refresh token issued by a previous authentication.
    RefreshToken,
    /// Facebook access token.
    Facebook,
    /// Twitter access token.
    Twitter,
    /// Google access token.
    Google,
    /// Username and password.
    UsernamePassword,
    /// Device-local anonymous identity.
    Anonymous,
}

/// Refresh credential for a session's identity.
///
/// Secret material is wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Refresh token issued by the authentication server.
    RefreshToken {
        /// The token value.
        token: String,
    },
    /// Facebook login.
    Facebook {
        /// The provider token.
        token: String,
    },
    /// Twitter login.
    Twitter {
        /// The provider token.
        token: String,
    },
    /// Google login.
    Google {
        /// The provider token.
        token: String,
    },
    /// Username and password login.
    UsernamePassword {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },
    /// Anonymous identity only known by this device.
    ///
    /// Losing it means the remote data cannot be recovered.
    Anonymous {
        /// Random identifier generated on creation.
        id: String,
    },
}

impl Credentials {
    /// Credentials from a refresh token.
    pub fn from_refresh_token(token: impl Into<String>) -> Self {
        Self::RefreshToken {
            token: token.into(),
        }
    }

    /// Credentials from a Facebook login.
    pub fn from_facebook(token: impl Into<String>) -> Self {
        Self::Facebook {
            token: token.into(),
        }
    }

    /// Credentials from a Twitter login.
    pub fn from_twitter(token: impl Into<String>) -> Self {
        Self::Twitter {
            token: token.into(),
        }
    }

    /// Credentials from a Google login.
    pub fn from_google(token: impl Into<String>) -> Self {
        Self::Google {
            token: token.into(),
        }
    }

    /// Credentials from a username and password.
    pub fn from_username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Fresh anonymous credentials with a random identifier.
    pub fn anonymous() -> Self {
        Self::Anonymous {
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// The login type of these credentials.
    pub fn login_type(&self) -> LoginType {
        match self {
            Self::RefreshToken { .. } => LoginType::RefreshToken,
            Self::Facebook { .. } => LoginType::Facebook,
            Self::Twitter { .. } => LoginType::Twitter,
            Self::Google { .. } => LoginType::Google,
            Self::UsernamePassword { .. } => LoginType::UsernamePassword,
            Self::Anonymous { .. } => LoginType::Anonymous,
        }
    }

    /// The primary value: the token, the username, or the anonymous id.
    pub fn value(&self) -> &str {
        match self {
            Self::RefreshToken { token }
            | Self::Facebook { token }
            | Self::Twitter { token }
            | Self::Google { token } => token,
            Self::UsernamePassword { username, .. } => username,
            Self::Anonymous { id } => id,
        }
    }

    /// The password, for username/password credentials.
    pub fn password(&self) -> Option<&str> {
        match self {
            Self::UsernamePassword { password, .. } => Some(password),
            _ => None,
        }
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        match self {
            Self::RefreshToken { token }
            | Self::Facebook { token }
            | Self::Twitter { token }
            | Self::Google { token } => token.zeroize(),
            Self::UsernamePassword { username, password } => {
                username.zeroize();
                password.zeroize();
            }
            Self::Anonymous { id } => id.zeroize(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_type", &self.login_type())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_type_matches_constructor() {
        assert_eq!(
            Credentials::from_refresh_token("t").login_type(),
            LoginType::RefreshToken
        );
        assert_eq!(Credentials::from_facebook("t").login_type(), LoginType::Facebook);
        assert_eq!(Credentials::from_twitter("t").login_type(), LoginType::Twitter);
        assert_eq!(Credentials::from_google("t").login_type(), LoginType::Google);
        assert_eq!(
            Credentials::from_username_password("u", "p").login_type(),
            LoginType::UsernamePassword
        );
        assert_eq!(Credentials::anonymous().login_type(), LoginType::Anonymous);
    }

    #[test]
    fn username_password_fields() {
        let creds = Credentials::from_username_password("alice", "hunter2");
        assert_eq!(creds.value(), "alice");
        assert_eq!(creds.password(), Some("hunter2"));
    }

    #[test]
    fn token_credentials_have_no_password() {
        let creds = Credentials::from_google("g-token");
        assert_eq!(creds.value(), "g-token");
        assert_eq!(creds.password(), None);
    }

    #[test]
    fn anonymous_credentials_are_unique() {
        assert_ne!(Credentials::anonymous(), Credentials::anonymous());
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::from_username_password("alice", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("UsernamePassword"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("alice"));
    }

    #[test]
    fn credentials_serialize_with_type_tag() {
        let creds = Credentials::from_refresh_token("rt");
        let json = serde_json::to_string(&creds).unwrap();
        assert_eq!(json, r#"{"type":"refresh_token","token":"rt"}"#);
    }
}
