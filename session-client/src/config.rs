//! Configuration loading for session-client.
//!
//! A session is configured from a TOML file or built in code:
//!
//! ```toml
//! server_url = "wss://sync.example.com/~/tasks"
//! local_path = "/data/tasks.db"
//! credentials_mode = "rebind"
//!
//! [retry]
//! max_attempts = 10
//!
//! [retry.backoff]
//! base_ms = 500
//! ceiling_ms = 60000
//!
//! [errors]
//! fatal = [{ start = 203, end = 206 }]
//! ```

use crate::error::ClientError;
use serde::Deserialize;
use session_core::{Backoff, ErrorPolicy};
use std::path::{Path, PathBuf};

/// Configuration of one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Server to bind to. Also the key of the access token store.
    pub server_url: String,
    /// Local store synchronized with the server.
    pub local_path: PathBuf,
    /// Authentication retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Error classification ranges.
    #[serde(default)]
    pub errors: ErrorPolicy,
    /// What `set_credentials` does to a running session.
    #[serde(default)]
    pub credentials_mode: CredentialsMode,
}

/// Authentication retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Delay schedule between attempts.
    #[serde(default)]
    pub backoff: Backoff,
    /// Attempts before giving up (default: unlimited).
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Authentication loops allowed to run at once (default: 4).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

/// Behavior of `set_credentials` on a session that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsMode {
    /// Only replace the credentials; they are used at the next authentication.
    #[default]
    Passthrough,
    /// Replace the credentials, drop the access token and authenticate again.
    Rebind,
}

fn default_max_workers() -> usize {
    crate::executor::DEFAULT_MAX_WORKERS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            max_attempts: None,
            max_workers: default_max_workers(),
        }
    }
}

impl SessionConfig {
    /// Configuration with defaults for everything but the endpoints.
    pub fn new(server_url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            server_url: server_url.into(),
            local_path: local_path.into(),
            retry: RetryConfig::default(),
            errors: ErrorPolicy::default(),
            credentials_mode: CredentialsMode::default(),
        }
    }

    /// Use `backoff` between authentication attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Give up authenticating after `max_attempts` attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = Some(max_attempts);
        self
    }

    /// Classify errors with `policy`.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.errors = policy;
        self
    }

    /// Choose what `set_credentials` does.
    pub fn with_credentials_mode(mut self, mode: CredentialsMode) -> Self {
        self.credentials_mode = mode;
        self
    }

    /// Check the configuration can drive a session.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.server_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig("server_url is empty".into()));
        }
        if self.local_path.as_os_str().is_empty() {
            return Err(ClientError::InvalidConfig("local_path is empty".into()));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ClientError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.backoff.base_ms > self.retry.backoff.ceiling_ms {
            return Err(ClientError::InvalidConfig(format!(
                "retry.backoff.base_ms ({}) exceeds ceiling_ms ({})",
                self.retry.backoff.base_ms, self.retry.backoff.ceiling_ms
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
