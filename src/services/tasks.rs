use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::AppResult;

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Supervised pool for fire-and-forget background work
///
/// Owned by the composition root and passed to services by injection. Tasks
/// are isolated: a failure or panic in one is logged and never cancels
/// siblings. On shutdown, pending tasks are cancelled cooperatively.
#[derive(Clone)]
pub struct TaskPool {
    task_tx: mpsc::UnboundedSender<BoxedTask>,
}

/// Handle for shutting down the task pool
pub struct TaskPoolHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl TaskPoolHandle {
    /// Signals the supervisor to cancel pending tasks and exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Task pool shutdown signal sent");
    }
}

impl TaskPool {
    /// Creates the pool and spawns its supervisor task
    pub fn new() -> (Self, TaskPoolHandle) {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::supervisor_task(task_rx, shutdown_rx).await;
        });

        (Self { task_tx }, TaskPoolHandle { shutdown_tx })
    }

    /// Supervisor loop: spawns submitted tasks and reaps their results
    async fn supervisor_task(
        mut task_rx: mpsc::UnboundedReceiver<BoxedTask>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Task pool supervisor started");
        let mut running: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                Some(task) = task_rx.recv() => {
                    running.spawn(task);
                }
                Some(result) = running.join_next() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Background task panicked or was aborted");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(
                        pending = running.len(),
                        "Task pool shutting down, cancelling pending tasks"
                    );
                    running.abort_all();
                    break;
                }
            }
        }

        tracing::info!("Task pool supervisor stopped");
    }

    /// Submits a background task
    ///
    /// The task's error is logged under `label`, never propagated; callers
    /// get no completion signal.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        let wrapped: BoxedTask = Box::pin(async move {
            if let Err(e) = task.await {
                tracing::error!(task = label, error = %e, "Background task failed");
            }
        });

        if self.task_tx.send(wrapped).is_err() {
            tracing::warn!(task = label, "Task pool is shut down, dropping task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawned_task_runs() {
        let (pool, _handle) = TaskPool::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        pool.spawn("test-task", async move {
            tx.send(42).map_err(|_| AppError::Internal("send failed".to_string()))?;
            Ok(())
        });

        let value = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_failing_task_does_not_stop_pool() {
        let (pool, _handle) = TaskPool::new();
        let counter = Arc::new(AtomicU32::new(0));

        pool.spawn("failing-task", async move {
            Err(AppError::Internal("expected failure".to_string()))
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        let counter_clone = Arc::clone(&counter);
        pool.spawn("following-task", async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
            Ok(())
        });

        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_pool() {
        let (pool, _handle) = TaskPool::new();

        pool.spawn("panicking-task", async move {
            panic!("expected panic");
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.spawn("survivor-task", async move {
            let _ = tx.send(());
            Ok(())
        });

        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_spawn_after_shutdown_is_dropped() {
        let (pool, handle) = TaskPool::new();
        handle.shutdown().await;

        // Give the supervisor time to exit
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Must not panic; the task is silently dropped
        pool.spawn("late-task", async move { Ok(()) });
    }
}
