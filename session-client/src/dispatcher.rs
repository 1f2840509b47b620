//! Error dispatch.
//!
//! Inbound error codes are classified with the session's [`ErrorPolicy`]
//! so the state machine can react, then forwarded to the application's
//! [`ErrorHandler`]. The handler always runs after the reaction and
//! outside the session lock.

use session_core::{ErrorClass, ErrorPolicy, SessionState};
use session_types::{ErrorCode, SessionId};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Snapshot of a session handed to error handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: SessionId,
    /// Target server.
    pub server_url: String,
    /// Local store.
    pub local_path: PathBuf,
    /// State after the session reacted to the error.
    pub state: SessionState,
}

/// Receives every error a session reports.
pub trait ErrorHandler: Send + Sync {
    /// Called once per reported error.
    fn on_error(&self, session: &SessionInfo, code: ErrorCode, message: &str);
}

impl<F> ErrorHandler for F
where
    F: Fn(&SessionInfo, ErrorCode, &str) + Send + Sync,
{
    fn on_error(&self, session: &SessionInfo, code: ErrorCode, message: &str) {
        self(session, code, message)
    }
}

/// Error handler that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn on_error(&self, session: &SessionInfo, code: ErrorCode, message: &str) {
        tracing::warn!(
            "Session {:?} ({}) error {}: {}",
            session.id,
            session.state,
            code,
            message
        );
    }
}

/// Classifies error codes and forwards them to the handler.
#[derive(Clone)]
pub struct ErrorDispatcher {
    policy: ErrorPolicy,
    handler: Option<Arc<dyn ErrorHandler>>,
}

impl ErrorDispatcher {
    /// Create a dispatcher for `policy` with no handler.
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            handler: None,
        }
    }

    /// Forward errors to `handler`.
    pub fn with_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Classify `code` under the configured policy.
    pub fn classify(&self, code: ErrorCode) -> ErrorClass {
        let class = self.policy.classify(code);
        tracing::debug!("Error {} classified as {:?}", code, class);
        class
    }

    /// Forward an error to the handler, if one is registered.
    pub fn notify(&self, session: &SessionInfo, code: ErrorCode, message: &str) {
        match &self.handler {
            Some(handler) => handler.on_error(session, code, message),
            None => tracing::warn!(
                "Unhandled error {} in session {:?}: {}",
                code,
                session.id,
                message
            ),
        }
    }

    /// The classification policy.
    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Whether a handler is registered.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for ErrorDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDispatcher")
            .field("policy", &self.policy)
            .field("has_handler", &self.has_handler())
            .finish()
    }
}
