// crates/tasks/src/types.rs
//! Handle for a task spawned onto the runtime.

use tokio::task::JoinHandle;

use crate::error::TaskError;

/// Handle to a spawned task invocation.
///
/// Dropping the handle detaches it; the invocation keeps running.
pub struct TaskHandle<T> {
    label: String,
    inner: JoinHandle<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(label: String, inner: JoinHandle<Result<T, TaskError>>) -> Self {
        Self { label, inner }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Stop local polling. The remote job is left running.
    pub fn abort(&self) {
        tracing::info!(label = %self.label, "task polling aborted");
        self.inner.abort();
    }

    /// Wait for the invocation. Returns `None` if it was aborted or panicked.
    pub async fn join(self) -> Option<Result<T, TaskError>> {
        match self.inner.await {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                tracing::error!(label = %self.label, "task panicked: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handle_join() {
        let handle = TaskHandle::new("x".into(), tokio::spawn(async { Ok::<_, TaskError>(7) }));
        assert_eq!(handle.label(), "x");
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.join().await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_handle_abort() {
        let handle = TaskHandle::new(
            "slow".into(),
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, TaskError>(())
            }),
        );
        assert!(!handle.is_finished());
        handle.abort();
        assert!(handle.join().await.is_none());
    }
}
