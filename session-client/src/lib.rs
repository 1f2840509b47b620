//! # session-client
//!
//! Session lifecycle manager for one synchronization link between a local
//! data store and a remote sync server.
//!
//! ## Features
//!
//! - **Pure State Machine**: Uses session-core for side-effect-free transitions
//! - **Serialized API**: start/bind/unbind/stop/refresh/errors never interleave
//! - **Authentication Retries**: capped exponential backoff, cancellable
//! - **Pluggable Collaborators**: transport and authentication client traits (with mocks)
//!
//! ## Example
//!
//! ```ignore
//! use syncbind_client::{Identity, MockAuthClient, MockTransport, Session, SessionConfig, SessionInfo};
//! use syncbind_types::Credentials;
//!
//! let identity = Arc::new(Identity::new(
//!     Credentials::from_refresh_token("refresh-token"),
//!     "https://auth.example.com/auth",
//! ));
//! let config = SessionConfig::new("wss://sync.example.com/~/tasks", "/data/tasks.db");
//! let session = Session::builder(config, MockTransport::new(), MockAuthClient::new(), identity)
//!     .error_handler(|info: &SessionInfo, code, message: &str| eprintln!("{}: {} {}", info.id, code, message))
//!     .build()?;
//!
//! session.start().await;
//! session.bind().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod identity;
pub mod retry;
pub mod session;
pub mod sync_policy;
pub mod token_store;
pub mod transport;

pub use auth::{AuthCall, AuthClient, AuthError, AuthResponse, MockAuthClient};
pub use config::{ConfigError, CredentialsMode, RetryConfig, SessionConfig};
pub use dispatcher::{ErrorDispatcher, ErrorHandler, LoggingErrorHandler, SessionInfo};
pub use error::ClientError;
pub use executor::{TaskExecutor, DEFAULT_MAX_WORKERS};
pub use identity::Identity;
pub use retry::{AuthOutcome, AuthRequest, RetryRunner, RetryTask};
pub use session::{Session, SessionBuilder, SessionControl};
pub use sync_policy::{AutomaticSyncPolicy, ManualSyncPolicy, SyncPolicy};
pub use token_store::AccessTokenStore;
pub use transport::{MockTransport, Transport, TransportCall, TransportError, TransportHandle};
