//! Sync policies.
//!
//! A policy decides when a started session binds. It is applied once when
//! the session starts and stopped when the session stops.

use crate::session::SessionControl;
use async_trait::async_trait;

/// Decides when a session binds.
#[async_trait]
pub trait SyncPolicy: Send + Sync {
    /// Called once after the session has started, outside the session lock.
    async fn apply(&self, session: &dyn SessionControl);

    /// Called when the session stops.
    fn stop(&self);
}

/// Leaves binding to the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualSyncPolicy;

#[async_trait]
impl SyncPolicy for ManualSyncPolicy {
    async fn apply(&self, _session: &dyn SessionControl) {}

    fn stop(&self) {}
}

/// Binds as soon as the session starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutomaticSyncPolicy;

#[async_trait]
impl SyncPolicy for AutomaticSyncPolicy {
    async fn apply(&self, session: &dyn SessionControl) {
        tracing::debug!("Automatic sync: binding session {:?}", session.id());
        session.bind().await;
    }

    fn stop(&self) {}
}
