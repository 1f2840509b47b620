//! Bounded task executor.
//!
//! Authentication loops run on a tokio runtime handle supplied by the
//! application, with a semaphore capping how many run at once. Tasks past
//! the cap are spawned but wait for a permit before doing any work.

use crate::error::ClientError;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrently running tasks.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Spawns tasks on a runtime, at most `max_workers` running at a time.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl TaskExecutor {
    /// Create an executor on `handle` running at most `max_workers` tasks.
    pub fn new(handle: Handle, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    /// Create an executor on the runtime of the calling task.
    pub fn current(max_workers: usize) -> Result<Self, ClientError> {
        let handle = Handle::try_current().map_err(|e| ClientError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle, max_workers))
    }

    /// Spawn `task`. It starts once a worker permit is available.
    ///
    /// Aborting the returned handle while the task waits for a permit
    /// cancels it without running.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.handle.spawn(async move {
            // Held until the task completes
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!("Task executor closed, dropping task");
                    return;
                }
            };
            task.await;
        })
    }

    /// Maximum number of concurrently running tasks.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers currently idle.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn current_uses_running_runtime() {
        let executor = TaskExecutor::current(2).unwrap();
        assert_eq!(executor.max_workers(), 2);
        assert_eq!(executor.available_workers(), 2);
    }

    #[test]
    fn current_without_runtime_fails() {
        let result = TaskExecutor::current(2);
        assert!(matches!(result, Err(ClientError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn zero_workers_is_raised_to_one() {
        let executor = TaskExecutor::current(0).unwrap();
        assert_eq!(executor.max_workers(), 1);
    }

    #[tokio::test]
    async fn spawn_runs_task() {
        let executor = TaskExecutor::current(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        executor
            .spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(executor.available_workers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bounds_concurrent_tasks() {
        let executor = TaskExecutor::current(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                executor.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_while_waiting_for_permit_never_runs() {
        let executor = TaskExecutor::current(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        let blocker = executor.spawn(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        let counter = Arc::clone(&ran);
        let waiting = executor.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        waiting.abort();
        assert!(waiting.await.unwrap_err().is_cancelled());
        blocker.await.unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
