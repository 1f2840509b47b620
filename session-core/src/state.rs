//! Session state machine for syncbind.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! a session's lifecycle. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening the transport, authenticating, binding) is
//! performed by session-client, not by this module. This enables instant
//! unit testing without network mocks.
//!
//! ```text
//! Initial ─start─► Started ─bind (no token)─► Authenticating ─auth ok─► Binding ─bind ok─► Bound
//!                  Started ─bind (valid token)──────────────────────────► Binding
//!                  Unbound ◄─unbind─ Binding | Bound
//!                  Started ◄─unbind─ Authenticating
//!
//! any state ─stop─► Stopped (terminal)
//! ```

use crate::policy::ErrorClass;
use session_types::Credentials;
use std::fmt;

/// Session lifecycle state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing allocated yet.
    Initial,
    /// Transport open, not bound.
    Started,
    /// Previously bound; binding released, transport still open.
    Unbound,
    /// Transport bind in progress with a valid access token.
    Binding,
    /// Obtaining an access token from the authentication server.
    Authenticating,
    /// Actively synchronizing.
    Bound,
    /// Terminal. Nothing leaves this state.
    Stopped,
}

impl SessionState {
    /// Create a new state machine in the Initial state.
    pub fn new() -> Self {
        Self::Initial
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (session-client)
    /// is responsible for executing the returned actions in order. When the
    /// state changes, the entry actions of the new state follow the
    /// transition's own actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        let (next, mut actions) = self.transition(event);
        if next != self {
            actions.extend(next.entry_actions());
        }
        (next, actions)
    }

    fn transition(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Terminal
            (Self::Stopped, _) => (Self::Stopped, vec![]),
            (_, Event::StopRequested) => (Self::Stopped, vec![]),

            // From Initial
            (Self::Initial, Event::StartRequested) => {
                (Self::Started, vec![Action::ApplySyncPolicy])
            }

            // Bind from a started-but-unbound session
            (Self::Started | Self::Unbound, Event::BindRequested { token_valid: true }) => {
                (Self::Binding, vec![])
            }
            (Self::Started | Self::Unbound, Event::BindRequested { token_valid: false }) => {
                (Self::Authenticating, vec![])
            }

            // From Authenticating (transport may still be bound after auth-expired)
            (Self::Authenticating, Event::UnbindRequested) => (
                Self::Started,
                vec![Action::CancelAuthentication, Action::UnbindTransport],
            ),
            (Self::Authenticating, Event::AuthSucceeded) => (Self::Binding, vec![]),
            (Self::Authenticating, Event::AuthFailed { reason }) => (
                Self::Started,
                vec![Action::UnbindTransport, Action::ReportAuthFailure { reason }],
            ),
            (Self::Authenticating, Event::ErrorReceived { class: ErrorClass::Fatal }) => {
                (Self::Stopped, vec![])
            }

            // From Binding
            (Self::Binding, Event::BindSucceeded) => (Self::Bound, vec![]),

            // From Binding or Bound (unbind also abandons a token refresh)
            (Self::Binding | Self::Bound, Event::UnbindRequested) => {
                (Self::Unbound, vec![Action::CancelAuthentication])
            }
            (Self::Binding | Self::Bound, Event::ErrorReceived { class }) => match class {
                ErrorClass::AuthExpired => (Self::Authenticating, vec![]),
                ErrorClass::Fatal => (Self::Stopped, vec![]),
                ErrorClass::ExternalOnly | ErrorClass::Ignorable => (self, vec![]),
            },

            // From Bound: token refresh
            (Self::Bound, Event::RefreshRequested) => {
                (Self::Bound, vec![Action::StartAuthentication])
            }
            (Self::Bound, Event::AuthSucceeded | Event::AccessTokenReplaced) => {
                (Self::Bound, vec![Action::RefreshTransport])
            }
            (Self::Bound, Event::AuthFailed { reason }) => {
                (Self::Bound, vec![Action::ReportAuthFailure { reason }])
            }

            // Credentials replacement
            (state, Event::CredentialsReplaced { credentials, rebind }) => {
                state.replace_credentials(credentials, rebind)
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    fn replace_credentials(self, credentials: Credentials, rebind: bool) -> (Self, Vec<Action>) {
        let replace = Action::ReplaceCredentials { credentials };
        if !rebind {
            return (self, vec![replace]);
        }
        match self {
            Self::Binding | Self::Bound => (
                Self::Authenticating,
                vec![Action::UnbindTransport, replace, Action::ClearAccessToken],
            ),
            Self::Authenticating => (
                Self::Authenticating,
                vec![
                    Action::CancelAuthentication,
                    replace,
                    Action::ClearAccessToken,
                    Action::StartAuthentication,
                ],
            ),
            state => (state, vec![replace, Action::ClearAccessToken]),
        }
    }

    /// Actions run whenever the machine enters this state.
    pub fn entry_actions(self) -> Vec<Action> {
        match self {
            Self::Initial | Self::Bound => vec![],
            Self::Started => vec![Action::OpenTransport],
            Self::Authenticating => vec![Action::StartAuthentication],
            Self::Binding => vec![Action::BindTransport],
            Self::Unbound => vec![Action::UnbindTransport],
            Self::Stopped => vec![
                Action::CancelAuthentication,
                Action::CloseTransport,
                Action::StopSyncPolicy,
            ],
        }
    }

    /// Check if currently bound.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound)
    }

    /// Check if the session has been stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Check if the session is converging towards Bound.
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Binding)
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Started => "started",
            Self::Unbound => "unbound",
            Self::Binding => "binding",
            Self::Authenticating => "authenticating",
            Self::Bound => "bound",
            Self::Stopped => "stopped",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Application called `start()`.
    StartRequested,
    /// Application called `bind()`.
    BindRequested {
        /// Whether a non-expired access token exists for the target.
        token_valid: bool,
    },
    /// Application called `unbind()`.
    UnbindRequested,
    /// Application called `stop()`.
    StopRequested,
    /// Application called `refresh()`.
    RefreshRequested,
    /// A new access token was stored by the application.
    AccessTokenReplaced,
    /// Application replaced the credentials.
    CredentialsReplaced {
        /// The new credentials.
        credentials: Credentials,
        /// Whether to drop the current token and bind again.
        rebind: bool,
    },
    /// An error code was classified.
    ErrorReceived {
        /// The classification of the code.
        class: ErrorClass,
    },
    /// The retry runner obtained an access token.
    AuthSucceeded,
    /// The retry runner gave up.
    AuthFailed {
        /// Why authentication gave up.
        reason: String,
    },
    /// The transport accepted the bind.
    BindSucceeded,
}

/// Actions to be executed by session-client.
///
/// These are instructions, not side effects. The session interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport for the local path, unless already open.
    OpenTransport,
    /// Bind the transport to the server with the current access token.
    BindTransport,
    /// Release the active binding; keep the handle.
    UnbindTransport,
    /// Hand the current access token to the bound transport.
    RefreshTransport,
    /// Close and release the transport handle.
    CloseTransport,
    /// Launch the retry runner, cancelling any previous one first.
    StartAuthentication,
    /// Cancel the retry runner, if any.
    CancelAuthentication,
    /// Apply the sync policy (after the session lock is released).
    ApplySyncPolicy,
    /// Stop the sync policy.
    StopSyncPolicy,
    /// Replace the identity's credentials.
    ReplaceCredentials {
        /// The new credentials.
        credentials: Credentials,
    },
    /// Forget the access token for the target.
    ClearAccessToken,
    /// Tell the error handler that authentication gave up.
    ReportAuthFailure {
        /// Why authentication gave up.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has(actions: &[Action], wanted: &Action) -> bool {
        actions.iter().any(|a| a == wanted)
    }

    fn bind(token_valid: bool) -> Event {
        Event::BindRequested { token_valid }
    }

    fn error(class: ErrorClass) -> Event {
        Event::ErrorReceived { class }
    }

    #[test]
    fn starts_initial() {
        let state = SessionState::new();
        assert!(matches!(state, SessionState::Initial));
    }

    #[test]
    fn start_opens_transport_and_applies_policy() {
        let (state, actions) = SessionState::Initial.on_event(Event::StartRequested);

        assert_eq!(state, SessionState::Started);
        assert!(has(&actions, &Action::OpenTransport));
        assert!(has(&actions, &Action::ApplySyncPolicy));
    }

    #[test]
    fn bind_without_valid_token_authenticates() {
        let (state, actions) = SessionState::Started.on_event(bind(false));

        assert_eq!(state, SessionState::Authenticating);
        assert_eq!(actions, vec![Action::StartAuthentication]);
    }

    #[test]
    fn bind_with_valid_token_skips_authentication() {
        let (state, actions) = SessionState::Started.on_event(bind(true));

        assert_eq!(state, SessionState::Binding);
        assert_eq!(actions, vec![Action::BindTransport]);
    }

    #[test]
    fn bind_from_unbound_follows_same_rule() {
        let (state, _) = SessionState::Unbound.on_event(bind(true));
        assert_eq!(state, SessionState::Binding);

        let (state, _) = SessionState::Unbound.on_event(bind(false));
        assert_eq!(state, SessionState::Authenticating);
    }

    #[test]
    fn bind_while_authenticating_is_dropped() {
        let (state, actions) = SessionState::Authenticating.on_event(bind(false));

        assert_eq!(state, SessionState::Authenticating);
        assert!(actions.is_empty(), "no second authentication: {:?}", actions);
    }

    #[test]
    fn bind_while_bound_is_idempotent() {
        let (state, actions) = SessionState::Bound.on_event(bind(true));

        assert_eq!(state, SessionState::Bound);
        assert!(actions.is_empty());
    }

    #[test]
    fn auth_success_moves_to_binding() {
        let (state, actions) = SessionState::Authenticating.on_event(Event::AuthSucceeded);

        assert_eq!(state, SessionState::Binding);
        assert_eq!(actions, vec![Action::BindTransport]);
    }

    #[test]
    fn auth_failure_reports_and_returns_to_started() {
        let (state, actions) = SessionState::Authenticating.on_event(Event::AuthFailed {
            reason: "revoked".into(),
        });

        assert_eq!(state, SessionState::Started);
        assert!(has(&actions, &Action::UnbindTransport));
        assert!(has(
            &actions,
            &Action::ReportAuthFailure {
                reason: "revoked".into()
            }
        ));
    }

    #[test]
    fn bind_success_moves_to_bound() {
        let (state, actions) = SessionState::Binding.on_event(Event::BindSucceeded);

        assert_eq!(state, SessionState::Bound);
        assert!(actions.is_empty());
    }

    #[test]
    fn unbind_while_authenticating_cancels_and_returns_to_started() {
        let (state, actions) = SessionState::Authenticating.on_event(Event::UnbindRequested);

        assert_eq!(state, SessionState::Started);
        assert!(has(&actions, &Action::CancelAuthentication));
        assert!(has(&actions, &Action::UnbindTransport));
    }

    #[test]
    fn unbind_from_bound_releases_binding() {
        let (state, actions) = SessionState::Bound.on_event(Event::UnbindRequested);

        assert_eq!(state, SessionState::Unbound);
        assert_eq!(
            actions,
            vec![Action::CancelAuthentication, Action::UnbindTransport]
        );
        assert!(!has(&actions, &Action::CloseTransport));
    }

    #[test]
    fn unbind_from_binding_releases_binding() {
        let (state, actions) = SessionState::Binding.on_event(Event::UnbindRequested);

        assert_eq!(state, SessionState::Unbound);
        assert_eq!(
            actions,
            vec![Action::CancelAuthentication, Action::UnbindTransport]
        );
    }

    #[test]
    fn auth_expired_while_bound_reauthenticates_without_closing() {
        let (state, actions) = SessionState::Bound.on_event(error(ErrorClass::AuthExpired));

        assert_eq!(state, SessionState::Authenticating);
        assert_eq!(actions, vec![Action::StartAuthentication]);
    }

    #[test]
    fn auth_expired_while_binding_reauthenticates() {
        let (state, _) = SessionState::Binding.on_event(error(ErrorClass::AuthExpired));
        assert_eq!(state, SessionState::Authenticating);
    }

    #[test]
    fn fatal_error_stops_bound_binding_and_authenticating() {
        for from in [
            SessionState::Bound,
            SessionState::Binding,
            SessionState::Authenticating,
        ] {
            let (state, actions) = from.on_event(error(ErrorClass::Fatal));
            assert_eq!(state, SessionState::Stopped, "from {}", from);
            assert!(has(&actions, &Action::CloseTransport));
        }
    }

    #[test]
    fn transient_errors_while_authenticating_are_absorbed() {
        for class in [
            ErrorClass::AuthExpired,
            ErrorClass::ExternalOnly,
            ErrorClass::Ignorable,
        ] {
            let (state, actions) = SessionState::Authenticating.on_event(error(class));
            assert_eq!(state, SessionState::Authenticating);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn non_session_errors_while_bound_change_nothing() {
        for class in [ErrorClass::ExternalOnly, ErrorClass::Ignorable] {
            let (state, actions) = SessionState::Bound.on_event(error(class));
            assert_eq!(state, SessionState::Bound);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn errors_in_idle_states_change_nothing() {
        for from in [
            SessionState::Initial,
            SessionState::Started,
            SessionState::Unbound,
        ] {
            let (state, actions) = from.on_event(error(ErrorClass::Fatal));
            assert_eq!(state, from);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn stop_releases_everything() {
        let (state, actions) = SessionState::Bound.on_event(Event::StopRequested);

        assert_eq!(state, SessionState::Stopped);
        assert!(has(&actions, &Action::CancelAuthentication));
        assert!(has(&actions, &Action::CloseTransport));
        assert!(has(&actions, &Action::StopSyncPolicy));
    }

    #[test]
    fn stop_from_initial_is_allowed() {
        let (state, _) = SessionState::Initial.on_event(Event::StopRequested);
        assert_eq!(state, SessionState::Stopped);
    }

    #[test]
    fn stopped_ignores_everything() {
        let events = vec![
            Event::StartRequested,
            bind(true),
            bind(false),
            Event::UnbindRequested,
            Event::StopRequested,
            Event::RefreshRequested,
            Event::AuthSucceeded,
            Event::BindSucceeded,
            error(ErrorClass::AuthExpired),
            Event::CredentialsReplaced {
                credentials: Credentials::from_refresh_token("t"),
                rebind: true,
            },
        ];
        for event in events {
            let (state, actions) = SessionState::Stopped.on_event(event.clone());
            assert_eq!(state, SessionState::Stopped, "{:?}", event);
            assert!(actions.is_empty(), "{:?}", event);
        }
    }

    #[test]
    fn no_call_sequence_escapes_stopped() {
        // Every sequence of up to five external calls.
        let calls = [
            Event::StartRequested,
            bind(true),
            bind(false),
            Event::UnbindRequested,
            Event::StopRequested,
        ];
        let mut frontier = vec![(SessionState::Initial, false)];
        for _ in 0..5 {
            let mut next = Vec::new();
            for (state, was_stopped) in &frontier {
                for call in &calls {
                    let (new_state, _) = state.on_event(call.clone());
                    if *was_stopped {
                        assert_eq!(new_state, SessionState::Stopped);
                    }
                    next.push((new_state, new_state.is_stopped()));
                }
            }
            frontier = next;
        }
    }

    #[test]
    fn refresh_while_bound_requests_new_token() {
        let (state, actions) = SessionState::Bound.on_event(Event::RefreshRequested);

        assert_eq!(state, SessionState::Bound);
        assert_eq!(actions, vec![Action::StartAuthentication]);
    }

    #[test]
    fn refresh_completion_while_bound_updates_transport() {
        let (state, actions) = SessionState::Bound.on_event(Event::AuthSucceeded);

        assert_eq!(state, SessionState::Bound);
        assert_eq!(actions, vec![Action::RefreshTransport]);
    }

    #[test]
    fn refresh_failure_while_bound_only_reports() {
        let (state, actions) = SessionState::Bound.on_event(Event::AuthFailed {
            reason: "down".into(),
        });

        assert_eq!(state, SessionState::Bound);
        assert_eq!(
            actions,
            vec![Action::ReportAuthFailure {
                reason: "down".into()
            }]
        );
    }

    #[test]
    fn refresh_outside_bound_is_noop() {
        for from in [
            SessionState::Initial,
            SessionState::Started,
            SessionState::Binding,
            SessionState::Authenticating,
            SessionState::Unbound,
        ] {
            let (state, actions) = from.on_event(Event::RefreshRequested);
            assert_eq!(state, from);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn replaced_token_while_bound_updates_transport() {
        let (state, actions) = SessionState::Bound.on_event(Event::AccessTokenReplaced);

        assert_eq!(state, SessionState::Bound);
        assert_eq!(actions, vec![Action::RefreshTransport]);
    }

    #[test]
    fn passthrough_credentials_never_change_state() {
        let credentials = Credentials::from_refresh_token("new");
        for from in [
            SessionState::Initial,
            SessionState::Started,
            SessionState::Authenticating,
            SessionState::Binding,
            SessionState::Bound,
            SessionState::Unbound,
        ] {
            let (state, actions) = from.on_event(Event::CredentialsReplaced {
                credentials: credentials.clone(),
                rebind: false,
            });
            assert_eq!(state, from);
            assert_eq!(
                actions,
                vec![Action::ReplaceCredentials {
                    credentials: credentials.clone()
                }]
            );
        }
    }

    #[test]
    fn rebind_credentials_while_bound_reauthenticates() {
        let credentials = Credentials::from_refresh_token("new");
        let (state, actions) = SessionState::Bound.on_event(Event::CredentialsReplaced {
            credentials: credentials.clone(),
            rebind: true,
        });

        assert_eq!(state, SessionState::Authenticating);
        assert_eq!(
            actions,
            vec![
                Action::UnbindTransport,
                Action::ReplaceCredentials { credentials },
                Action::ClearAccessToken,
                Action::StartAuthentication,
            ]
        );
    }

    #[test]
    fn rebind_credentials_while_authenticating_restarts() {
        let (state, actions) = SessionState::Authenticating.on_event(Event::CredentialsReplaced {
            credentials: Credentials::from_refresh_token("new"),
            rebind: true,
        });

        assert_eq!(state, SessionState::Authenticating);
        assert_eq!(actions.first(), Some(&Action::CancelAuthentication));
        assert_eq!(actions.last(), Some(&Action::StartAuthentication));
    }

    #[test]
    fn rebind_credentials_while_idle_clears_token() {
        let (state, actions) = SessionState::Started.on_event(Event::CredentialsReplaced {
            credentials: Credentials::from_refresh_token("new"),
            rebind: true,
        });

        assert_eq!(state, SessionState::Started);
        assert!(has(&actions, &Action::ClearAccessToken));
        assert!(!has(&actions, &Action::StartAuthentication));
    }

    #[test]
    fn full_bind_flow() {
        let state = SessionState::Initial;

        let (state, _) = state.on_event(Event::StartRequested);
        assert_eq!(state, SessionState::Started);

        let (state, _) = state.on_event(bind(false));
        assert_eq!(state, SessionState::Authenticating);

        let (state, _) = state.on_event(Event::AuthSucceeded);
        assert_eq!(state, SessionState::Binding);

        let (state, _) = state.on_event(Event::BindSucceeded);
        assert!(state.is_bound());

        let (state, _) = state.on_event(Event::UnbindRequested);
        assert_eq!(state, SessionState::Unbound);

        let (state, _) = state.on_event(bind(true));
        assert_eq!(state, SessionState::Binding);

        let (state, _) = state.on_event(Event::StopRequested);
        assert!(state.is_stopped());
    }

    #[test]
    fn state_helpers() {
        assert!(SessionState::Bound.is_bound());
        assert!(!SessionState::Binding.is_bound());
        assert!(SessionState::Binding.is_binding());
        assert!(SessionState::Authenticating.is_binding());
        assert!(!SessionState::Started.is_binding());
        assert!(SessionState::Stopped.is_stopped());
        assert_eq!(SessionState::Authenticating.to_string(), "authenticating");
    }
}
