use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub shown_at: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= TOAST_DURATION
    }
}

#[derive(Debug, Default)]
pub struct Notifier {
    toasts: Vec<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.push(ToastKind::Error, message);
    }

    fn push(&mut self, kind: ToastKind, message: String) {
        self.toasts.push(Toast {
            kind,
            message,
            shown_at: Instant::now(),
        });
    }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&mut self, now: Instant) -> &[Toast] {
        self.toasts.retain(|t| !t.is_expired(now));
        &self.toasts
    }

    pub fn last(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}
