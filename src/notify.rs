//! User-facing notifications ("toasts") emitted by the sync pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

pub const INFO_DURATION: Duration = Duration::from_millis(2000);
pub const SUCCESS_DURATION: Duration = Duration::from_millis(3000);
pub const ERROR_DURATION: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// Action attached to a notification, e.g. "Retry".
#[derive(Clone)]
pub struct RetryAction(Arc<dyn Fn() + Send + Sync>);

impl RetryAction {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn run(&self) {
        (self.0)()
    }
}

impl fmt::Debug for RetryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryAction")
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration: Duration,
    pub retry: Option<RetryAction>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            duration: INFO_DURATION,
            retry: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            duration: SUCCESS_DURATION,
            retry: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            duration: ERROR_DURATION,
            retry: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryAction) -> Self {
        self.retry = Some(retry);
        self
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to a front end over a channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification dropped, receiver closed");
        }
    }
}

/// Writes notifications to the log; used by headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::error!("{}", notification.message),
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!("{}", notification.message)
            }
        }
    }
}
