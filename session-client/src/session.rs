//! Session façade.
//!
//! `Session` drives the pure state machine from session-core and performs
//! the I/O its actions describe. Every call takes the session lock, feeds
//! one event through the machine and executes the resulting actions; an
//! action may produce a follow-up event, processed in the same locked
//! section. Sync policy application and error handler calls are deferred
//! until the lock is released.
//!
//! Authentication completions come back from the retry task through the
//! same path, tagged with the generation of the task that produced them.
//! A completion whose generation is no longer current is dropped, so a
//! cancelled authentication never writes a token.

use crate::auth::AuthClient;
use crate::config::{CredentialsMode, SessionConfig};
use crate::dispatcher::{ErrorDispatcher, ErrorHandler, SessionInfo};
use crate::error::ClientError;
use crate::executor::TaskExecutor;
use crate::identity::Identity;
use crate::retry::{AuthOutcome, AuthRequest, RetryRunner, RetryTask};
use crate::sync_policy::{ManualSyncPolicy, SyncPolicy};
use crate::transport::{Transport, TransportHandle};
use async_trait::async_trait;
use session_core::{Action, ErrorClass, Event, SessionState};
use session_types::{AccessToken, Credentials, ErrorCode, SessionError, SessionId};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle operations a sync policy can drive.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// See [`Session::start`].
    async fn start(&self);
    /// See [`Session::stop`].
    async fn stop(&self);
    /// See [`Session::bind`].
    async fn bind(&self);
    /// See [`Session::unbind`].
    async fn unbind(&self);
    /// See [`Session::refresh`].
    async fn refresh(&self);
    /// See [`Session::state`].
    async fn state(&self) -> SessionState;
    /// See [`Session::id`].
    fn id(&self) -> SessionId;
}

/// One synchronization link between a local store and a server.
///
/// Clones share the same session. Errors never come back as `Result`s;
/// they drive the state machine and reach the error handler.
pub struct Session<T, A> {
    inner: Arc<SessionInner<T, A>>,
}

struct SessionInner<T, A> {
    id: SessionId,
    config: SessionConfig,
    transport: T,
    identity: Arc<Identity>,
    runner: RetryRunner<A>,
    dispatcher: ErrorDispatcher,
    sync_policy: Arc<dyn SyncPolicy>,
    core: Mutex<SessionCore>,
}

/// Everything guarded by the session lock.
struct SessionCore {
    state: SessionState,
    handle: Option<TransportHandle>,
    bound: bool,
    retry: Option<RetryTask>,
    generation: u64,
}

/// Work run after the session lock is released.
enum Deferred {
    ApplySyncPolicy,
    Notify { code: ErrorCode, message: String },
}

impl Deferred {
    fn notify(error: &SessionError) -> Self {
        Self::Notify {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

type Processing<'a> = Pin<Box<dyn Future<Output = Vec<Deferred>> + Send + 'a>>;

/// Builder for [`Session`].
pub struct SessionBuilder<T, A> {
    config: SessionConfig,
    transport: T,
    auth: A,
    identity: Arc<Identity>,
    handler: Option<Arc<dyn ErrorHandler>>,
    sync_policy: Arc<dyn SyncPolicy>,
    executor: Option<TaskExecutor>,
}

impl<T, A> SessionBuilder<T, A>
where
    T: Transport + 'static,
    A: AuthClient + 'static,
{
    /// Report errors to `handler`.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Decide when to bind with `policy` (default: manual).
    pub fn sync_policy(mut self, policy: impl SyncPolicy + 'static) -> Self {
        self.sync_policy = Arc::new(policy);
        self
    }

    /// Run authentication on `executor` (default: the current runtime).
    pub fn executor(mut self, executor: TaskExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the session in the Initial state.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, or if no executor was given
    /// and there is no current tokio runtime.
    pub fn build(self) -> Result<Session<T, A>, ClientError> {
        self.config.validate()?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => TaskExecutor::current(self.config.retry.max_workers)?,
        };
        let runner = RetryRunner::new(Arc::new(self.auth), self.config.retry.backoff, executor)
            .with_max_attempts(self.config.retry.max_attempts);

        let mut dispatcher = ErrorDispatcher::new(self.config.errors.clone());
        if let Some(handler) = self.handler {
            dispatcher = dispatcher.with_handler(handler);
        }

        let id = SessionId::new();
        tracing::info!(
            "Session {:?} created for {} ({})",
            id,
            self.config.server_url,
            self.config.local_path.display()
        );

        Ok(Session {
            inner: Arc::new(SessionInner {
                id,
                config: self.config,
                transport: self.transport,
                identity: self.identity,
                runner,
                dispatcher,
                sync_policy: self.sync_policy,
                core: Mutex::new(SessionCore {
                    state: SessionState::new(),
                    handle: None,
                    bound: false,
                    retry: None,
                    generation: 0,
                }),
            }),
        })
    }
}

impl<T, A> Session<T, A>
where
    T: Transport + 'static,
    A: AuthClient + 'static,
{
    /// Start building a session.
    pub fn builder(
        config: SessionConfig,
        transport: T,
        auth: A,
        identity: Arc<Identity>,
    ) -> SessionBuilder<T, A> {
        SessionBuilder {
            config,
            transport,
            auth,
            identity,
            handler: None,
            sync_policy: Arc::new(ManualSyncPolicy),
            executor: None,
        }
    }

    /// Open the transport and apply the sync policy.
    pub async fn start(&self) {
        self.inner.dispatch(|_| Event::StartRequested).await;
    }

    /// Stop for good: cancel authentication and release the transport.
    pub async fn stop(&self) {
        self.inner.dispatch(|_| Event::StopRequested).await;
    }

    /// Bind to the server, authenticating first if no valid token exists.
    pub async fn bind(&self) {
        self.inner
            .dispatch(|inner| Event::BindRequested {
                token_valid: inner.identity.is_authenticated(&inner.config.server_url),
            })
            .await;
    }

    /// Release the binding (or abandon authentication) and keep the transport open.
    pub async fn unbind(&self) {
        self.inner.dispatch(|_| Event::UnbindRequested).await;
    }

    /// Request a new access token for a bound session.
    pub async fn refresh(&self) {
        self.inner.dispatch(|_| Event::RefreshRequested).await;
    }

    /// Store `token` for this target and hand it to a bound transport.
    pub async fn refresh_access_token(&self, token: AccessToken) {
        self.inner
            .dispatch(move |inner| {
                inner
                    .identity
                    .set_access_token(&inner.config.server_url, token);
                Event::AccessTokenReplaced
            })
            .await;
    }

    /// Replace the identity's credentials.
    ///
    /// With [`CredentialsMode::Rebind`] the access token is dropped and a
    /// binding session authenticates again.
    #[deprecated(note = "replace credentials on the shared Identity instead")]
    pub async fn set_credentials(&self, credentials: Credentials) {
        self.inner
            .dispatch(move |inner| Event::CredentialsReplaced {
                credentials,
                rebind: inner.config.credentials_mode == CredentialsMode::Rebind,
            })
            .await;
    }

    /// React to an error code reported by the transport layer, then
    /// forward it to the error handler.
    pub async fn handle_error(&self, code: impl Into<ErrorCode>, message: &str) {
        self.inner.handle_error(code.into(), message).await;
    }

    /// Current state.
    pub async fn state(&self) -> SessionState {
        self.inner.core.lock().await.state
    }

    /// Whether the session is bound.
    pub async fn is_bound(&self) -> bool {
        self.state().await.is_bound()
    }

    /// Whether a non-expired access token exists for `target`.
    pub fn is_authenticated(&self, target: &str) -> bool {
        self.inner.identity.is_authenticated(target)
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Snapshot of the session.
    pub async fn info(&self) -> SessionInfo {
        let state = self.state().await;
        self.inner.info(state)
    }

    /// The configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The identity.
    pub fn identity(&self) -> &Arc<Identity> {
        &self.inner.identity
    }
}

impl<T, A> SessionInner<T, A>
where
    T: Transport + 'static,
    A: AuthClient + 'static,
{
    async fn dispatch<F>(self: &Arc<Self>, event: F)
    where
        F: FnOnce(&Self) -> Event,
    {
        let mut core = self.core.lock().await;
        let event = event(self);
        let deferred = self.process(&mut core, event).await;
        let state = core.state;
        drop(core);

        self.run_deferred(deferred, state).await;
    }

    async fn handle_error(self: &Arc<Self>, code: ErrorCode, message: &str) {
        let mut core = self.core.lock().await;
        if core.state.is_stopped() {
            tracing::debug!("Session {:?} stopped, dropping error {}", self.id, code);
            return;
        }

        let class = self.dispatcher.classify(code);
        let mut deferred = vec![Deferred::Notify {
            code,
            message: message.to_string(),
        }];
        deferred.extend(self.process(&mut core, Event::ErrorReceived { class }).await);
        let state = core.state;
        drop(core);

        self.run_deferred(deferred, state).await;
    }

    async fn complete_authentication(self: &Arc<Self>, generation: u64, outcome: AuthOutcome) {
        let mut core = self.core.lock().await;
        if core.retry.as_ref().map(RetryTask::generation) != Some(generation) {
            tracing::debug!(
                "Session {:?} ignoring stale authentication result {}",
                self.id,
                generation
            );
            return;
        }
        core.retry = None;

        let event = match outcome {
            AuthOutcome::Granted(token) => {
                tracing::debug!("Session {:?} authenticated", self.id);
                self.identity
                    .set_access_token(&self.config.server_url, token);
                Event::AuthSucceeded
            }
            AuthOutcome::Failed(reason) => Event::AuthFailed { reason },
        };
        let deferred = self.process(&mut core, event).await;
        let state = core.state;
        drop(core);

        self.run_deferred(deferred, state).await;
    }

    fn process<'a>(self: &'a Arc<Self>, core: &'a mut SessionCore, event: Event) -> Processing<'a> {
        Box::pin(async move {
            let mut deferred = Vec::new();
            let mut events = VecDeque::from([event]);

            while let Some(event) = events.pop_front() {
                let from = core.state;
                let (to, actions) = from.on_event(event);
                if from != to {
                    tracing::debug!("Session {:?}: {} -> {}", self.id, from, to);
                }
                core.state = to;

                for action in actions {
                    if let Some(next) = self.execute(core, action, &mut deferred).await {
                        events.push_back(next);
                    }
                }
            }

            deferred
        })
    }

    async fn execute(
        self: &Arc<Self>,
        core: &mut SessionCore,
        action: Action,
        deferred: &mut Vec<Deferred>,
    ) -> Option<Event> {
        let target = self.config.server_url.as_str();

        match action {
            Action::OpenTransport => {
                if let Err(e) = self.open_transport(core).await {
                    deferred.push(Deferred::notify(&e));
                }
                None
            }
            Action::BindTransport => {
                let Some(token) = self.identity.access_token(target) else {
                    tracing::debug!("Session {:?} has no valid token, re-authenticating", self.id);
                    return Some(Event::ErrorReceived {
                        class: ErrorClass::AuthExpired,
                    });
                };
                if let Err(e) = self.open_transport(core).await {
                    deferred.push(Deferred::notify(&e));
                    return Some(Event::ErrorReceived {
                        class: ErrorClass::Fatal,
                    });
                }
                let handle = core.handle.as_ref()?;
                match self.transport.bind(handle, target, token.value()).await {
                    Ok(()) => {
                        core.bound = true;
                        tracing::info!("Session {:?} bound to {}", self.id, target);
                        Some(Event::BindSucceeded)
                    }
                    Err(e) => {
                        tracing::warn!("Session {:?} bind failed: {}", self.id, e);
                        Some(self.transport_failure(e.code(), e.to_string(), deferred))
                    }
                }
            }
            Action::UnbindTransport => {
                if core.bound {
                    if let Some(handle) = core.handle.as_ref() {
                        if let Err(e) = self.transport.unbind(handle).await {
                            tracing::warn!("Session {:?} unbind failed: {}", self.id, e);
                        }
                    }
                    core.bound = false;
                }
                None
            }
            Action::RefreshTransport => {
                if !core.bound {
                    return None;
                }
                let handle = core.handle.as_ref()?;
                let Some(token) = self.identity.access_token(target) else {
                    return Some(Event::ErrorReceived {
                        class: ErrorClass::AuthExpired,
                    });
                };
                match self.transport.refresh(handle, token.value()).await {
                    Ok(()) => {
                        tracing::debug!("Session {:?} refreshed its access token", self.id);
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Session {:?} token refresh failed: {}", self.id, e);
                        Some(self.transport_failure(e.code(), e.to_string(), deferred))
                    }
                }
            }
            Action::CloseTransport => {
                core.bound = false;
                if let Some(handle) = core.handle.take() {
                    if let Err(e) = self.transport.close(handle).await {
                        tracing::warn!("Session {:?} close failed: {}", self.id, e);
                    }
                }
                None
            }
            Action::StartAuthentication => {
                self.start_authentication(core).await;
                None
            }
            Action::CancelAuthentication => {
                if let Some(task) = core.retry.take() {
                    task.cancel().await;
                }
                None
            }
            Action::ApplySyncPolicy => {
                deferred.push(Deferred::ApplySyncPolicy);
                None
            }
            Action::StopSyncPolicy => {
                self.sync_policy.stop();
                None
            }
            Action::ReplaceCredentials { credentials } => {
                self.identity.set_credentials(credentials);
                None
            }
            Action::ClearAccessToken => {
                self.identity.tokens().remove(target);
                None
            }
            Action::ReportAuthFailure { reason } => {
                tracing::warn!("Session {:?} authentication failed: {}", self.id, reason);
                deferred.push(Deferred::notify(&SessionError::AuthenticationFailed(reason)));
                None
            }
        }
    }

    async fn open_transport(&self, core: &mut SessionCore) -> Result<(), SessionError> {
        if core.handle.is_some() {
            return Ok(());
        }
        match self.transport.open(&self.config.local_path).await {
            Ok(handle) => {
                tracing::debug!("Session {:?} opened transport {}", self.id, handle.id());
                core.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Session {:?} failed to open transport: {}", self.id, e);
                Err(SessionError::Transport {
                    code: e.code(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn transport_failure(
        &self,
        code: ErrorCode,
        message: String,
        deferred: &mut Vec<Deferred>,
    ) -> Event {
        let class = self.dispatcher.classify(code);
        deferred.push(Deferred::Notify { code, message });
        Event::ErrorReceived { class }
    }

    async fn start_authentication(self: &Arc<Self>, core: &mut SessionCore) {
        if let Some(previous) = core.retry.take() {
            previous.cancel().await;
        }

        core.generation += 1;
        let generation = core.generation;
        let request = AuthRequest {
            server_url: self.config.server_url.clone(),
            identity: Arc::clone(&self.identity),
        };
        let session = Arc::downgrade(self);

        tracing::debug!("Session {:?} starting authentication {}", self.id, generation);
        let task = self.runner.start(generation, request, move |outcome| async move {
            if let Some(inner) = session.upgrade() {
                inner.complete_authentication(generation, outcome).await;
            }
        });
        core.retry = Some(task);
    }

    async fn run_deferred(self: &Arc<Self>, deferred: Vec<Deferred>, state: SessionState) {
        for work in deferred {
            match work {
                Deferred::ApplySyncPolicy => {
                    let session = Session {
                        inner: Arc::clone(self),
                    };
                    self.sync_policy.apply(&session).await;
                }
                Deferred::Notify { code, message } => {
                    self.dispatcher.notify(&self.info(state), code, &message);
                }
            }
        }
    }

    fn info(&self, state: SessionState) -> SessionInfo {
        SessionInfo {
            id: self.id,
            server_url: self.config.server_url.clone(),
            local_path: self.config.local_path.clone(),
            state,
        }
    }
}

impl<T, A> Drop for SessionInner<T, A> {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if !core.state.is_stopped() {
            tracing::warn!(
                "Session {:?} dropped in state {} without stop(); transport not released",
                self.id,
                core.state
            );
        }
        if let Some(task) = core.retry.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl<T, A> SessionControl for Session<T, A>
where
    T: Transport + 'static,
    A: AuthClient + 'static,
{
    async fn start(&self) {
        Session::start(self).await
    }

    async fn stop(&self) {
        Session::stop(self).await
    }

    async fn bind(&self) {
        Session::bind(self).await
    }

    async fn unbind(&self) {
        Session::unbind(self).await
    }

    async fn refresh(&self) {
        Session::refresh(self).await
    }

    async fn state(&self) -> SessionState {
        Session::state(self).await
    }

    fn id(&self) -> SessionId {
        self.inner.id
    }
}

impl<T, A> Clone for Session<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A> fmt::Debug for Session<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("server_url", &self.inner.config.server_url)
            .finish_non_exhaustive()
    }
}
