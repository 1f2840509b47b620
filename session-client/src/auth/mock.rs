//! Mock authentication client for testing.
//!
//! Answers from a queue of scripted responses, then from a fallback.
//! An optional delay simulates a slow server.

use super::{AuthClient, AuthError, AuthResponse};
use async_trait::async_trait;
use session_types::{AccessToken, Credentials, LoginType};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCall {
    /// Login type of the credentials.
    pub login_type: LoginType,
    /// Credential value (token or username).
    pub credential: String,
    /// Target the token was requested for.
    pub server_url: String,
    /// Authentication server contacted.
    pub auth_url: String,
}

#[derive(Debug, Clone, Copy)]
enum Fallback {
    Reject,
    Grant(Duration),
}

/// Mock authentication client for testing.
#[derive(Debug)]
pub struct MockAuthClient {
    inner: Arc<Mutex<MockAuthInner>>,
}

#[derive(Debug)]
struct MockAuthInner {
    queue: VecDeque<Result<AuthResponse, AuthError>>,
    fallback: Fallback,
    delay: Option<Duration>,
    calls: Vec<AuthCall>,
    issued: u64,
}

impl MockAuthClient {
    /// A client that rejects every request not scripted with `queue_response`.
    pub fn new() -> Self {
        Self::with_fallback(Fallback::Reject)
    }

    /// A client that grants `token-1`, `token-2`, ... valid for `ttl`.
    pub fn granting(ttl: Duration) -> Self {
        Self::with_fallback(Fallback::Grant(ttl))
    }

    fn with_fallback(fallback: Fallback) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockAuthInner {
                queue: VecDeque::new(),
                fallback,
                delay: None,
                calls: Vec::new(),
                issued: 0,
            })),
        }
    }

    /// Wait `delay` before answering each request.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().delay = Some(delay);
        self
    }

    /// Answer the next unanswered request with `response`.
    pub fn queue_response(&self, response: Result<AuthResponse, AuthError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.queue.push_back(response);
    }

    /// Answer the next unanswered request with a rejection.
    pub fn queue_rejection(&self, reason: &str) {
        self.queue_response(Ok(AuthResponse::Rejected {
            reason: reason.to_string(),
        }));
    }

    /// Number of requests received, including ones still waiting on the delay.
    pub fn call_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.len()
    }

    /// All requests received, in order.
    pub fn calls(&self) -> Vec<AuthCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    fn answer(inner: &mut MockAuthInner) -> Result<AuthResponse, AuthError> {
        if let Some(response) = inner.queue.pop_front() {
            return response;
        }
        match inner.fallback {
            Fallback::Reject => Ok(AuthResponse::Rejected {
                reason: "no scripted response".to_string(),
            }),
            Fallback::Grant(ttl) => {
                inner.issued += 1;
                let value = format!("token-{}", inner.issued);
                Ok(AuthResponse::Granted(AccessToken::expiring_in(value, ttl)))
            }
        }
    }
}

impl Default for MockAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAuthClient {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl AuthClient for MockAuthClient {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        server_url: &str,
        auth_url: &str,
    ) -> Result<AuthResponse, AuthError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(AuthCall {
                login_type: credentials.login_type(),
                credential: credentials.value().to_string(),
                server_url: server_url.to_string(),
                auth_url: auth_url.to_string(),
            });
            inner.delay
        };

        // Lock released while sleeping so the test can inspect the mock
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        Self::answer(&mut inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER: &str = "wss://sync.example.com/~/tasks";
    const AUTH: &str = "https://auth.example.com/auth";

    #[tokio::test]
    async fn default_rejects() {
        let client = MockAuthClient::new();
        let creds = Credentials::from_refresh_token("rt");

        let response = client.authenticate(&creds, SERVER, AUTH).await.unwrap();

        assert!(matches!(response, AuthResponse::Rejected { .. }));
    }

    #[tokio::test]
    async fn granting_issues_numbered_tokens() {
        let client = MockAuthClient::granting(Duration::from_secs(60));
        let creds = Credentials::from_refresh_token("rt");

        let first = client.authenticate(&creds, SERVER, AUTH).await.unwrap();
        let second = client.authenticate(&creds, SERVER, AUTH).await.unwrap();

        match (first, second) {
            (AuthResponse::Granted(a), AuthResponse::Granted(b)) => {
                assert_eq!(a.value(), "token-1");
                assert_eq!(b.value(), "token-2");
                assert!(a.is_valid());
            }
            other => panic!("expected two grants, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn scripted_responses_come_first() {
        let client = MockAuthClient::granting(Duration::from_secs(60));
        client.queue_rejection("try later");
        client.queue_response(Err(AuthError::Network("timeout".into())));
        let creds = Credentials::from_refresh_token("rt");

        assert!(matches!(
            client.authenticate(&creds, SERVER, AUTH).await,
            Ok(AuthResponse::Rejected { .. })
        ));
        assert_eq!(
            client.authenticate(&creds, SERVER, AUTH).await,
            Err(AuthError::Network("timeout".into()))
        );
        assert!(client.authenticate(&creds, SERVER, AUTH).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn records_calls() {
        let client = MockAuthClient::new();
        let creds = Credentials::from_username_password("alice", "secret");

        client.authenticate(&creds, SERVER, AUTH).await.unwrap();

        assert_eq!(
            client.calls(),
            vec![AuthCall {
                login_type: LoginType::UsernamePassword,
                credential: "alice".to_string(),
                server_url: SERVER.to_string(),
                auth_url: AUTH.to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_call_before_answering() {
        let client = MockAuthClient::granting(Duration::from_secs(60))
            .with_delay(Duration::from_secs(10));
        let observer = client.clone();

        let task = tokio::spawn(async move {
            let creds = Credentials::from_refresh_token("rt");
            client.authenticate(&creds, SERVER, AUTH).await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(observer.call_count(), 1);
        assert!(!task.is_finished());

        let response = task.await.unwrap().unwrap();
        assert!(response.is_valid());
    }
}
