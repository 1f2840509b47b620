//! Transport abstraction for syncbind.
//!
//! The transport is the data transfer engine that synchronizes once a
//! session is bound. Sessions only drive its lifecycle through an owned
//! [`TransportHandle`]:
//! - `open()` allocates a handle for a local store
//! - `bind()` starts synchronizing with a server using an access token
//! - `unbind()` stops synchronizing but keeps the handle
//! - `refresh()` hands the bound connection a new access token
//! - `close()` releases the handle for good
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! let handle = transport.open(Path::new("/data/tasks.db")).await?;
//! transport.bind(&handle, "wss://sync.example.com/~/tasks", token.value()).await?;
//! transport.close(handle).await?;
//! ```

mod mock;

pub use mock::{MockTransport, TransportCall};

use async_trait::async_trait;
use session_types::ErrorCode;
use std::path::Path;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The local store could not be opened.
    #[error("open failed: {0}")]
    OpenFailed(String),

    /// The handle was already closed.
    #[error("handle closed")]
    HandleClosed,

    /// The handle is not bound.
    #[error("not bound")]
    NotBound,

    /// The server rejected the request with an error code.
    #[error("rejected with {code}: {message}")]
    Rejected {
        /// Code reported by the server.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },

    /// Local I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl TransportError {
    /// The error code this failure is reported and classified as.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::OpenFailed(_) | Self::HandleClosed | Self::NotBound | Self::Io(_) => {
                ErrorCode::IO_EXCEPTION
            }
        }
    }
}

/// Opaque handle to an opened transport.
///
/// Not `Clone`: exactly one owner, and `close()` consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TransportHandle {
    id: u64,
}

impl TransportHandle {
    /// Wrap a transport-assigned identifier.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The transport-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Transport trait for the synchronization engine behind a session.
///
/// Implementations handle the underlying connection mechanism
/// (native sync client, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Allocate a handle for the local store at `local_path`.
    async fn open(&self, local_path: &Path) -> Result<TransportHandle, TransportError>;

    /// Start synchronizing `handle` with `server_url`, authorized by `access_token`.
    async fn bind(
        &self,
        handle: &TransportHandle,
        server_url: &str,
        access_token: &str,
    ) -> Result<(), TransportError>;

    /// Stop synchronizing; the handle stays open.
    async fn unbind(&self, handle: &TransportHandle) -> Result<(), TransportError>;

    /// Replace the access token of a bound handle.
    async fn refresh(&self, handle: &TransportHandle, access_token: &str)
        -> Result<(), TransportError>;

    /// Release the handle. Later operations on its id fail with `HandleClosed`.
    async fn close(&self, handle: TransportHandle) -> Result<(), TransportError>;
}
