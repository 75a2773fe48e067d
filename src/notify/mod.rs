//! Transient user notifications for finished or failed dictations.
//!
//! ```text
//! complete / error ──▶ NotificationDispatcher ──(localize)──▶ pending queue
//!                                                                  │ flush().await
//!                                                                  ▼
//!                                                          dyn Notifier (toast, log…)
//! ```
//!
//! Bridge handlers are synchronous, so the dispatcher only builds and queues
//! the notification; the owning window awaits [`NotificationDispatcher::flush`]
//! between deliveries.

pub mod dispatcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use dispatcher::NotificationDispatcher;

/// Notification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to show notification: {0}")]
    SendFailed(String),
}

/// Visual flavour of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

impl NotificationLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One localized, auto-dismissing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// How long the toast stays on screen.
    pub timeout: Duration,
}

/// Port for showing notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Blanket implementation for boxed notifier types
#[async_trait]
impl Notifier for Box<dyn Notifier> {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.as_ref().notify(notification).await
    }
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Default adapter: writes each notification to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        match notification.level {
            NotificationLevel::Success => log::info!(
                "notification [{}ms]: {}",
                notification.timeout.as_millis(),
                notification.message
            ),
            NotificationLevel::Error => log::warn!(
                "notification [{}ms]: {}",
                notification.timeout.as_millis(),
                notification.message
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let n = Notification {
            level: NotificationLevel::Error,
            message: "Error: boom".into(),
            timeout: Duration::from_millis(4_000),
        };
        assert_eq!(LogNotifier.notify(&n).await, Ok(()));
    }

    #[tokio::test]
    async fn boxed_notifier_delegates() {
        let boxed: Box<dyn Notifier> = Box::new(LogNotifier);
        let n = Notification {
            level: NotificationLevel::Success,
            message: "ok".into(),
            timeout: Duration::ZERO,
        };
        assert!(boxed.notify(&n).await.is_ok());
    }

    #[test]
    fn level_names() {
        assert_eq!(NotificationLevel::Success.as_str(), "success");
        assert_eq!(NotificationLevel::Error.as_str(), "error");
    }
}
