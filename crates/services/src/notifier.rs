use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Side channel for toasts and similar user-facing messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(text = %notice.message, "notice"),
            NoticeLevel::Error => warn!(text = %notice.message, "notice"),
        }
    }
}

/// Keeps every notice in memory so callers can inspect them.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

/// Forwards at most one notice; later ones are dropped.
pub struct NoticeLatch {
    notifier: Arc<dyn Notifier>,
    shown: AtomicBool,
}

impl NoticeLatch {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            shown: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the notice was forwarded.
    pub fn notify_once(&self, notice: Notice) -> bool {
        if self.shown.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.notifier.notify(notice);
        true
    }

    #[must_use]
    pub fn already_shown(&self) -> bool {
        self.shown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_forwards_only_the_first_notice() {
        let recorder = RecordingNotifier::new();
        let latch = NoticeLatch::new(Arc::new(recorder.clone()));

        assert!(latch.notify_once(Notice::error("first")));
        assert!(!latch.notify_once(Notice::error("second")));
        assert!(latch.already_shown());
        assert_eq!(recorder.notices(), vec![Notice::error("first")]);
    }
}
