// crates/tasks/src/error.rs
use std::time::Duration;

use skyview_core::FailureKind;
use thiserror::Error;

/// Errors talking to the job service.
#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Failure of one task invocation.
///
/// The display string is the caller-facing rejection message; failure
/// notifications reuse it verbatim.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {label} failed to start.")]
    StartFailed {
        label: String,
        #[source]
        source: JobServiceError,
    },

    #[error("{message}")]
    PollFailed {
        label: String,
        message: String,
        detail: String,
    },

    #[error("{message}")]
    Reported {
        label: String,
        message: String,
        detail: Option<String>,
    },

    #[error("Task {label} timed out after {} seconds.", .after.as_secs())]
    Timeout { label: String, after: Duration },

    #[error("Task {label} is already running.")]
    AlreadyRunning { label: String },
}

/// `Task <label> failed.`, or with the detail appended when allowed.
pub fn failure_message(label: &str, detail: Option<&str>, include_detail: bool) -> String {
    match detail {
        Some(detail) if include_detail && !detail.is_empty() => {
            format!("Task {label} failed with error: {detail}")
        }
        _ => format!("Task {label} failed."),
    }
}

impl TaskError {
    pub(crate) fn poll_failed(label: &str, detail: String, include_detail: bool) -> Self {
        Self::PollFailed {
            label: label.to_string(),
            message: failure_message(label, Some(&detail), include_detail),
            detail,
        }
    }

    pub(crate) fn reported(label: &str, detail: Option<String>, include_detail: bool) -> Self {
        Self::Reported {
            label: label.to_string(),
            message: failure_message(label, detail.as_deref(), include_detail),
            detail,
        }
    }

    /// Failure classification, or `None` for a rejected concurrent call
    /// (which never started a job).
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::StartFailed { .. } => Some(FailureKind::StartFailed),
            Self::PollFailed { .. } => Some(FailureKind::PollFailed),
            Self::Reported { .. } => Some(FailureKind::Reported),
            Self::Timeout { .. } => Some(FailureKind::Timeout),
            Self::AlreadyRunning { .. } => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::StartFailed { label, .. }
            | Self::PollFailed { label, .. }
            | Self::Reported { label, .. }
            | Self::Timeout { label, .. }
            | Self::AlreadyRunning { label } => label,
        }
    }
}
