// crates/tasks/src/runner.rs
//! Submit a job, poll until it is ready, and return its result.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use skyview_core::{
    FailureKind, JobId, Notification, NotificationHandle, Notifier, TaskConfig, TaskOutcome,
    TaskResult, TracingNotifier,
};

use crate::client::{JobService, SubmitRequest};
use crate::error::TaskError;
use crate::state::{JobSlot, RunnerSnapshot};
use crate::types::TaskHandle;

/// Runs one job at a time against a [`JobService`].
///
/// Every call to [`run`](Self::run) ends in exactly one `Ok` or `Err`, and
/// the runner is back to idle by the time the call returns. Independent
/// runners share nothing and can run concurrently.
pub struct TaskRunner {
    service: Arc<dyn JobService>,
    notifier: Arc<dyn Notifier>,
    config: TaskConfig,
    slot: JobSlot,
}

impl TaskRunner {
    /// Create a runner that reports notifications to the `tracing` log.
    pub fn new(service: Arc<dyn JobService>, config: TaskConfig) -> Self {
        Self {
            service,
            notifier: Arc::new(TracingNotifier::new()),
            config,
            slot: JobSlot::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        self.slot.snapshot()
    }

    pub async fn run<T: DeserializeOwned>(&self, route: &str) -> Result<T, TaskError> {
        self.run_with(route, SubmitRequest::default()).await
    }

    /// Like [`run`](Self::run), with method/body/header overrides for the
    /// submission request.
    pub async fn run_with<T: DeserializeOwned>(
        &self,
        route: &str,
        request: SubmitRequest,
    ) -> Result<T, TaskError> {
        let label = self.config.label.as_str();
        let Some(run) = self.slot.try_acquire() else {
            tracing::warn!(label, route, "task already running, rejecting new run");
            return Err(TaskError::AlreadyRunning {
                label: label.to_string(),
            });
        };
        let started = Instant::now();
        let mut toast = NotificationScope::new(
            self.config
                .show_notifications
                .then(|| Arc::clone(&self.notifier)),
        );

        let id = match self.service.submit(route, &request).await {
            Ok(id) => id,
            Err(source) => {
                tracing::warn!(label, route, error = %source, "task failed to start");
                let err = TaskError::StartFailed {
                    label: label.to_string(),
                    source,
                };
                run.record(TaskOutcome::Failed(FailureKind::StartFailed));
                toast.fail(err.to_string());
                return Err(err);
            }
        };

        tracing::info!(label, route, job_id = %id, "task started");
        run.start_polling(id.clone());
        toast.start(label);

        let fetched = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_result(&id))
                .await
                .unwrap_or_else(|_| {
                    Err(TaskError::Timeout {
                        label: label.to_string(),
                        after: limit,
                    })
                }),
            None => self.wait_for_result(&id).await,
        };
        let result = fetched.and_then(|r| self.finish(&id, r));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                tracing::info!(label, job_id = %id, elapsed_ms, "task complete");
                run.record(TaskOutcome::Succeeded);
                toast.succeed(label);
            }
            Err(e) => {
                tracing::warn!(label, job_id = %id, elapsed_ms, kind = ?e.kind(), "{e}");
                if let Some(kind) = e.kind() {
                    run.record(TaskOutcome::Failed(kind));
                }
                toast.fail(e.to_string());
            }
        }
        result
    }

    /// Run on a background tokio task.
    pub fn spawn<T>(self: &Arc<Self>, route: impl Into<String>) -> TaskHandle<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.spawn_with(route, SubmitRequest::default())
    }

    pub fn spawn_with<T>(self: &Arc<Self>, route: impl Into<String>, request: SubmitRequest) -> TaskHandle<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let runner = Arc::clone(self);
        let route = route.into();
        let inner = tokio::spawn(async move { runner.run_with::<T>(&route, request).await });
        TaskHandle::new(self.config.label.clone(), inner)
    }

    /// Poll readiness, then fetch the result. The result is never requested
    /// before a readiness check has returned `true`.
    async fn wait_for_result(&self, id: &JobId) -> Result<TaskResult<serde_json::Value>, TaskError> {
        let label = self.config.label.as_str();
        let include_detail = self.config.notify_on_error;
        let mut checks: u64 = 0;

        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            checks += 1;
            match self.service.is_ready(id).await {
                Ok(true) => break,
                Ok(false) => tracing::trace!(job_id = %id, checks, "task not ready"),
                Err(e) => {
                    tracing::debug!(job_id = %id, error = %e, "readiness check failed");
                    return Err(TaskError::poll_failed(label, e.to_string(), include_detail));
                }
            }
        }

        tracing::debug!(job_id = %id, checks, "task ready, fetching result");
        self.service
            .result(id)
            .await
            .map_err(|e| TaskError::poll_failed(label, e.to_string(), include_detail))
    }

    fn finish<T: DeserializeOwned>(
        &self,
        id: &JobId,
        result: TaskResult<serde_json::Value>,
    ) -> Result<T, TaskError> {
        let label = self.config.label.as_str();
        if let Some(secs) = result.execution_time {
            tracing::debug!(job_id = %id, execution_time_secs = secs, "job execution time");
        }
        if result.is_err {
            let detail = result.error_detail().map(str::to_string);
            return Err(TaskError::reported(label, detail, self.config.notify_on_error));
        }
        let value = result.return_value.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|e| {
            TaskError::poll_failed(
                label,
                format!("invalid return value: {e}"),
                self.config.notify_on_error,
            )
        })
    }
}

/// The notification for one invocation.
///
/// Terminal updates consume the handle; a scope dropped while its
/// notification is still in progress hides it.
struct NotificationScope {
    notifier: Option<Arc<dyn Notifier>>,
    handle: Option<NotificationHandle>,
}

impl NotificationScope {
    fn new(notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            notifier,
            handle: None,
        }
    }

    fn start(&mut self, label: &str) {
        self.handle = self.put(Notification::in_progress(label));
    }

    fn succeed(&mut self, label: &str) {
        self.put(Notification::success(label));
    }

    fn fail(&mut self, message: String) {
        self.put(Notification::failure(message));
    }

    /// Update the current notification in place, or show a new one.
    fn put(&mut self, notification: Notification) -> Option<NotificationHandle> {
        let notifier = self.notifier.as_ref()?;
        Some(match self.handle.take() {
            Some(handle) => notifier.update(handle, notification),
            None => notifier.show(notification),
        })
    }
}

impl Drop for NotificationScope {
    fn drop(&mut self) {
        if let (Some(notifier), Some(handle)) = (&self.notifier, self.handle.take()) {
            notifier.hide(handle);
        }
    }
}
