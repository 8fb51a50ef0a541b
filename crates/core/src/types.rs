// crates/core/src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque job token issued by the job service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Payload of `GET /tasks/{id}/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult<T> {
    pub is_err: bool,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Server-side execution time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<serde_json::Value>,
}

impl<T> TaskResult<T> {
    /// Best available description of why the job failed.
    ///
    /// Prefers the explicit `error` field; falls back to the last non-empty
    /// line of the job log.
    pub fn error_detail(&self) -> Option<&str> {
        if let Some(error) = self.error.as_deref().map(str::trim) {
            if !error.is_empty() {
                return Some(error);
            }
        }
        self.log
            .as_deref()
            .and_then(|log| log.lines().rev().map(str::trim).find(|l| !l.is_empty()))
    }
}

/// Non-terminal phase of a task runner.
///
/// `Succeeded` and `Failed` are not stored: they collapse back to `Idle`
/// the moment they are reached, and are reported through [`TaskOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Idle = 0,
    Submitting = 1,
    Polling = 2,
}

impl TaskPhase {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Submitting,
            2 => Self::Polling,
            _ => Self::Idle,
        }
    }
}

/// Why a task invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The submission request failed.
    StartFailed,
    /// A readiness or result request failed.
    PollFailed,
    /// The job service completed the job with an error payload.
    Reported,
    /// The job did not become ready within the configured timeout.
    Timeout,
}

/// Terminal outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "kind")]
pub enum TaskOutcome {
    Succeeded,
    Failed(FailureKind),
}
