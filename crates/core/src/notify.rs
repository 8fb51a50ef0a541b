// crates/core/src/notify.rs
//! User-facing task notifications.
//!
//! A task runner drives a [`Notifier`] through three calls: `show` when the
//! job has been accepted, `update` when it reaches a terminal state, and
//! `hide` when local polling is torn down before that. The sink decides how
//! notifications are rendered (toast, banner, terminal spinner, log line).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

/// How long success and failure notifications stay visible.
pub const TERMINAL_AUTO_CLOSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InProgress,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// `None` keeps the notification on screen until it is replaced.
    #[serde(with = "auto_close_ms")]
    pub auto_close: Option<Duration>,
    pub closable: bool,
}

impl Notification {
    /// Persistent, non-closable "task started" notification.
    pub fn in_progress(label: &str) -> Self {
        Self {
            title: "Task running".into(),
            message: format!("Task {label} started."),
            kind: NotificationKind::InProgress,
            auto_close: None,
            closable: false,
        }
    }

    pub fn success(label: &str) -> Self {
        Self {
            title: "Task complete".into(),
            message: format!("Task {label} completed."),
            kind: NotificationKind::Success,
            auto_close: Some(TERMINAL_AUTO_CLOSE),
            closable: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            title: "Task failed".into(),
            message: message.into(),
            kind: NotificationKind::Failure,
            auto_close: Some(TERMINAL_AUTO_CLOSE),
            closable: true,
        }
    }
}

mod auto_close_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(d.as_millis() as u64),
            None => s.serialize_bool(false),
        }
    }
}

/// Opaque handle to a notification owned by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NotificationHandle(u64);

impl NotificationHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Sink for task lifecycle notifications.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification) -> NotificationHandle;

    /// Replace the notification behind `handle`. Returns the handle that now
    /// owns the notification (sinks may reuse the same one).
    fn update(&self, handle: NotificationHandle, notification: Notification) -> NotificationHandle;

    fn hide(&self, handle: NotificationHandle);
}

/// Monotonic handle allocator shared by the stock sinks.
#[derive(Debug, Default)]
struct HandleSeq(AtomicU64);

impl HandleSeq {
    fn next(&self) -> NotificationHandle {
        NotificationHandle(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Writes every notification to the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingNotifier {
    seq: HandleSeq,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(handle: NotificationHandle, n: &Notification) {
        match n.kind {
            NotificationKind::InProgress | NotificationKind::Success => {
                tracing::info!(handle = handle.id(), title = %n.title, "{}", n.message)
            }
            NotificationKind::Failure => {
                tracing::warn!(handle = handle.id(), title = %n.title, "{}", n.message)
            }
        }
    }
}

impl Notifier for TracingNotifier {
    fn show(&self, notification: Notification) -> NotificationHandle {
        let handle = self.seq.next();
        Self::log(handle, &notification);
        handle
    }

    fn update(&self, handle: NotificationHandle, notification: Notification) -> NotificationHandle {
        Self::log(handle, &notification);
        handle
    }

    fn hide(&self, handle: NotificationHandle) {
        tracing::debug!(handle = handle.id(), "notification dismissed");
    }
}

/// Discards all notifications.
#[derive(Debug, Default)]
pub struct NoopNotifier {
    seq: HandleSeq,
}

impl Notifier for NoopNotifier {
    fn show(&self, _notification: Notification) -> NotificationHandle {
        self.seq.next()
    }

    fn update(&self, handle: NotificationHandle, _notification: Notification) -> NotificationHandle {
        handle
    }

    fn hide(&self, _handle: NotificationHandle) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Show,
    Update,
    Hide,
}

/// One notifier call, as published by [`BroadcastNotifier`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub handle: NotificationHandle,
    pub action: NotificationAction,
    pub notification: Option<Notification>,
    pub timestamp: String,
}

/// Publishes notifier calls on a broadcast channel.
///
/// Any number of consumers (a websocket bridge, a terminal renderer, tests)
/// can `subscribe`. Sending with no subscribers is not an error.
pub struct BroadcastNotifier {
    seq: HandleSeq,
    tx: broadcast::Sender<NotificationEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            seq: HandleSeq::default(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, handle: NotificationHandle, action: NotificationAction, notification: Option<Notification>) {
        let _ = self.tx.send(NotificationEvent {
            handle,
            action,
            notification,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for BroadcastNotifier {
    fn show(&self, notification: Notification) -> NotificationHandle {
        let handle = self.seq.next();
        self.publish(handle, NotificationAction::Show, Some(notification));
        handle
    }

    fn update(&self, handle: NotificationHandle, notification: Notification) -> NotificationHandle {
        self.publish(handle, NotificationAction::Update, Some(notification));
        handle
    }

    fn hide(&self, handle: NotificationHandle) {
        self.publish(handle, NotificationAction::Hide, None);
    }
}
