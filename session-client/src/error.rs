//! Error types for session-client.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised while assembling a session.
///
/// Once built, a session reports failures through its error handler
/// instead of returning them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No tokio runtime is available to run authentication tasks.
    #[error("no tokio runtime: {0}")]
    NoRuntime(String),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
