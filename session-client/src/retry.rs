//! Authentication retry runner.
//!
//! Runs the authentication loop as one task on the [`TaskExecutor`]:
//! wait for the backoff delay of the current attempt, ask the
//! [`AuthClient`] once, and repeat until a valid token arrives or the
//! credentials are refused for good.
//!
//! The loop only suspends in the backoff sleep and the authentication
//! call, so [`RetryTask::cancel`] stops it at either point. A cancelled
//! task never calls its completion.

use crate::auth::{AuthClient, AuthResponse};
use crate::executor::TaskExecutor;
use crate::identity::Identity;
use session_core::Backoff;
use session_types::AccessToken;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What the authentication loop needs to ask for a token.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Target the token is requested for.
    pub server_url: String,
    /// Identity whose credentials are exchanged. Read again on every attempt.
    pub identity: Arc<Identity>,
}

/// How an authentication loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A valid access token was obtained.
    Granted(AccessToken),
    /// The loop gave up.
    Failed(String),
}

/// Launches authentication loops.
pub struct RetryRunner<A> {
    client: Arc<A>,
    backoff: Backoff,
    max_attempts: Option<u32>,
    executor: TaskExecutor,
}

impl<A: AuthClient + 'static> RetryRunner<A> {
    /// Create a runner that retries without limit.
    pub fn new(client: Arc<A>, backoff: Backoff, executor: TaskExecutor) -> Self {
        Self {
            client,
            backoff,
            max_attempts: None,
            executor,
        }
    }

    /// Give up after `max_attempts` attempts (`None` retries forever).
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Start an authentication loop tagged with `generation`.
    ///
    /// `on_complete` is called exactly once with the outcome, unless the
    /// task is cancelled first.
    pub fn start<F, Fut>(&self, generation: u64, request: AuthRequest, on_complete: F) -> RetryTask
    where
        F: FnOnce(AuthOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let backoff = self.backoff;
        let max_attempts = self.max_attempts;

        let handle = self.executor.spawn(async move {
            let outcome = run_attempts(client.as_ref(), backoff, max_attempts, &request).await;
            on_complete(outcome).await;
        });

        RetryTask { generation, handle }
    }

    /// The backoff schedule.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}

async fn run_attempts<A: AuthClient>(
    client: &A,
    backoff: Backoff,
    max_attempts: Option<u32>,
    request: &AuthRequest,
) -> AuthOutcome {
    let mut attempt: u32 = 0;
    loop {
        if max_attempts.is_some_and(|max| attempt >= max) {
            tracing::warn!(
                "Authentication for {} gave up after {} attempts",
                request.server_url,
                attempt
            );
            return AuthOutcome::Failed(format!("gave up after {} attempts", attempt));
        }

        let delay = backoff.delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tracing::debug!(
            "Authentication attempt {} for {}",
            attempt + 1,
            request.server_url
        );
        let credentials = request.identity.credentials();
        let response = client
            .authenticate(
                &credentials,
                &request.server_url,
                request.identity.auth_url(),
            )
            .await;

        match response {
            Ok(AuthResponse::Granted(token)) if token.is_valid() => {
                return AuthOutcome::Granted(token);
            }
            Ok(AuthResponse::Granted(_)) => {
                tracing::debug!("Authentication returned an expired token, retrying");
            }
            Ok(AuthResponse::Rejected { reason }) => {
                tracing::debug!("Authentication rejected ({}), retrying", reason);
            }
            Err(e) if e.is_retryable() => {
                tracing::debug!("Authentication failed ({}), retrying", e);
            }
            Err(e) => {
                tracing::warn!("Authentication for {} failed: {}", request.server_url, e);
                return AuthOutcome::Failed(e.to_string());
            }
        }

        attempt = attempt.saturating_add(1);
    }
}

/// Handle to a running authentication loop.
#[derive(Debug)]
pub struct RetryTask {
    generation: u64,
    handle: JoinHandle<()>,
}

impl RetryTask {
    /// Generation the task was started with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request cancellation without waiting for it.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Cancel the task and wait until it has terminated.
    pub async fn cancel(self) {
        self.handle.abort();
        match self.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Authentication task {} cancelled", self.generation);
            }
            Err(e) => {
                tracing::warn!("Authentication task {} panicked: {}", self.generation, e);
            }
        }
    }
}
