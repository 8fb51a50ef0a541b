// crates/cli/src/spinner.rs
//! Terminal rendering of task notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use skyview_core::{Notification, NotificationHandle, NotificationKind, Notifier};

/// Draws in-progress notifications as spinners on stderr and replaces them
/// with a one-line summary when the task finishes.
#[derive(Default)]
pub struct SpinnerNotifier {
    next: AtomicU64,
    bars: Mutex<HashMap<NotificationHandle, ProgressBar>>,
}

impl SpinnerNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn render(notification: &Notification) -> String {
        match notification.kind {
            NotificationKind::InProgress => notification.message.clone(),
            NotificationKind::Success => format!("\u{2713} {}", notification.message),
            NotificationKind::Failure => format!("\u{2717} {}", notification.message),
        }
    }

    fn take(&self, handle: NotificationHandle) -> Option<ProgressBar> {
        match self.bars.lock() {
            Ok(mut bars) => bars.remove(&handle),
            Err(e) => {
                tracing::error!("Mutex poisoned reading spinners: {e}");
                None
            }
        }
    }

    fn put(&self, handle: NotificationHandle, notification: &Notification) {
        let line = Self::render(notification);
        if notification.kind == NotificationKind::InProgress {
            let pb = Self::spinner(&line);
            match self.bars.lock() {
                Ok(mut bars) => {
                    bars.insert(handle, pb);
                }
                Err(e) => tracing::error!("Mutex poisoned writing spinners: {e}"),
            }
        } else {
            eprintln!("  {line}");
        }
    }
}

impl Notifier for SpinnerNotifier {
    fn show(&self, notification: Notification) -> NotificationHandle {
        let handle = NotificationHandle::new(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.put(handle, &notification);
        handle
    }

    fn update(&self, handle: NotificationHandle, notification: Notification) -> NotificationHandle {
        if let Some(pb) = self.take(handle) {
            pb.finish_and_clear();
        }
        self.put(handle, &notification);
        handle
    }

    fn hide(&self, handle: NotificationHandle) {
        if let Some(pb) = self.take(handle) {
            pb.finish_and_clear();
        }
    }
}
