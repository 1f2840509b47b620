//! Mock transport for testing.
//!
//! Records every call, tracks handle lifecycles and allows injecting failures.

use super::{Transport, TransportError, TransportHandle};
use async_trait::async_trait;
use session_types::ErrorCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A call made on the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `open(local_path)`.
    Open {
        /// The local path.
        local_path: PathBuf,
    },
    /// `bind(handle, server_url, access_token)`.
    Bind {
        /// Handle id.
        handle: u64,
        /// Server the handle was bound to.
        server_url: String,
        /// Token value used.
        access_token: String,
    },
    /// `unbind(handle)`.
    Unbind {
        /// Handle id.
        handle: u64,
    },
    /// `refresh(handle, access_token)`.
    Refresh {
        /// Handle id.
        handle: u64,
        /// New token value.
        access_token: String,
    },
    /// `close(handle)`.
    Close {
        /// Handle id.
        handle: u64,
    },
}

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one clone while the session
/// owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    next_id: u64,
    handles: HashMap<u64, MockHandle>,
    calls: Vec<TransportCall>,
    fail_next_open: Option<String>,
    fail_next_bind: Option<(ErrorCode, String)>,
    fail_next_refresh: Option<(ErrorCode, String)>,
}

#[derive(Debug, Default)]
struct MockHandle {
    closed: bool,
    bound_to: Option<String>,
    access_token: Option<String>,
}

impl MockTransportInner {
    fn live_handle(&mut self, handle: &TransportHandle) -> Result<&mut MockHandle, TransportError> {
        match self.handles.get_mut(&handle.id()) {
            Some(h) if !h.closed => Ok(h),
            _ => Err(TransportError::HandleClosed),
        }
    }
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of `open()` calls that succeeded.
    pub fn open_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.handles.len()
    }

    /// Ids of every handle ever opened, in order.
    pub fn handle_ids(&self) -> Vec<u64> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<u64> = inner.handles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether the handle with `id` is open.
    pub fn is_open(&self, id: u64) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.handles.get(&id).is_some_and(|h| !h.closed)
    }

    /// Server the handle with `id` is bound to, if any.
    pub fn bound_server(&self, id: u64) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.handles.get(&id).and_then(|h| h.bound_to.clone())
    }

    /// Access token currently held by the handle with `id`.
    pub fn access_token(&self, id: u64) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.handles.get(&id).and_then(|h| h.access_token.clone())
    }

    /// Cause the next open() to fail with the given error.
    pub fn fail_next_open(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_open = Some(error.to_string());
    }

    /// Cause the next bind() to be rejected with the given code.
    pub fn fail_next_bind(&self, code: ErrorCode, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_bind = Some((code, message.to_string()));
    }

    /// Cause the next refresh() to be rejected with the given code.
    pub fn fail_next_refresh(&self, code: ErrorCode, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_refresh = Some((code, message.to_string()));
    }

    /// Clear all state (handles, calls, injected failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, local_path: &Path) -> Result<TransportHandle, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Open {
            local_path: local_path.to_path_buf(),
        });

        // Check for forced failure
        if let Some(error) = inner.fail_next_open.take() {
            return Err(TransportError::OpenFailed(error));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.handles.insert(id, MockHandle::default());
        Ok(TransportHandle::new(id))
    }

    async fn bind(
        &self,
        handle: &TransportHandle,
        server_url: &str,
        access_token: &str,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Bind {
            handle: handle.id(),
            server_url: server_url.to_string(),
            access_token: access_token.to_string(),
        });

        let rejection = inner.fail_next_bind.take();
        let h = inner.live_handle(handle)?;
        if let Some((code, message)) = rejection {
            return Err(TransportError::Rejected { code, message });
        }

        h.bound_to = Some(server_url.to_string());
        h.access_token = Some(access_token.to_string());
        Ok(())
    }

    async fn unbind(&self, handle: &TransportHandle) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Unbind {
            handle: handle.id(),
        });

        let h = inner.live_handle(handle)?;
        if h.bound_to.take().is_none() {
            return Err(TransportError::NotBound);
        }
        h.access_token = None;
        Ok(())
    }

    async fn refresh(
        &self,
        handle: &TransportHandle,
        access_token: &str,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Refresh {
            handle: handle.id(),
            access_token: access_token.to_string(),
        });

        let rejection = inner.fail_next_refresh.take();
        let h = inner.live_handle(handle)?;
        if h.bound_to.is_none() {
            return Err(TransportError::NotBound);
        }
        if let Some((code, message)) = rejection {
            return Err(TransportError::Rejected { code, message });
        }

        h.access_token = Some(access_token.to_string());
        Ok(())
    }

    async fn close(&self, handle: TransportHandle) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Close {
            handle: handle.id(),
        });

        let h = inner.live_handle(&handle)?;
        h.closed = true;
        h.bound_to = None;
        h.access_token = None;
        Ok(())
    }
}
