//! Turns terminal pipeline events into localized notifications.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Notification, NotificationLevel, Notifier};
use crate::config::NotificationConfig;
use crate::events::{EventBridge, EventKind, PipelineEvent, Subscription};
use crate::i18n::Localizer;
use crate::settings::{SettingKey, SettingsStore};

/// Main-window component that shows one notification per `complete` or
/// `error` event.
///
/// The message is resolved in the UI language cached by the window's
/// [`SettingsStore`] at the moment the event arrives.  Every event yields
/// exactly one notification; repeats are not collapsed.
pub struct NotificationDispatcher {
    localizer: Arc<Localizer>,
    settings: Arc<SettingsStore>,
    notifier: Arc<dyn Notifier>,
    config: NotificationConfig,
    pending: Mutex<VecDeque<Notification>>,
}

impl NotificationDispatcher {
    pub fn new(
        localizer: Arc<Localizer>,
        settings: Arc<SettingsStore>,
        notifier: Arc<dyn Notifier>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            localizer,
            settings,
            notifier,
            config,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Localized notification for `event`, or `None` for non-terminal kinds.
    pub fn build(&self, event: &PipelineEvent) -> Option<Notification> {
        let language = self.settings.get(SettingKey::UiLanguage);
        match event {
            PipelineEvent::Complete(result) => {
                let ms = result.total_latency_ms.to_string();
                Some(Notification {
                    level: NotificationLevel::Success,
                    message: self
                        .localizer
                        .resolve(&language, "notify.complete", &[("ms", &ms)]),
                    timeout: self.config.success_timeout(),
                })
            }
            PipelineEvent::Error(message) => Some(Notification {
                level: NotificationLevel::Error,
                message: self
                    .localizer
                    .resolve(&language, "notify.error", &[("message", message)]),
                timeout: self.config.error_timeout(),
            }),
            PipelineEvent::State(_) | PipelineEvent::Level(_) => None,
        }
    }

    /// Queue the notification for `event`.  Returns whether one was queued.
    pub fn enqueue(&self, event: &PipelineEvent) -> bool {
        match self.build(event) {
            Some(notification) => {
                log::debug!(
                    "notify: queued {} '{}'",
                    notification.level.as_str(),
                    notification.message
                );
                self.lock().push_back(notification);
                true
            }
            None => false,
        }
    }

    /// Register for `complete` and `error` on `bridge`.
    pub fn attach(self: &Arc<Self>, bridge: &EventBridge) -> Vec<Subscription> {
        [EventKind::Complete, EventKind::Error]
            .into_iter()
            .map(|kind| {
                let this = Arc::clone(self);
                bridge.subscribe(kind, move |event| {
                    this.enqueue(event);
                })
            })
            .collect()
    }

    /// Number of notifications waiting for [`flush`](Self::flush).
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Hand every queued notification to the notifier, oldest first.
    ///
    /// A notifier failure is logged and the next notification is still
    /// attempted.  Returns how many were shown.
    pub async fn flush(&self) -> usize {
        let mut shown = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(notification) = next else { break };
            match self.notifier.notify(&notification).await {
                Ok(()) => shown += 1,
                Err(e) => log::warn!("notify: '{}' not shown: {e}", notification.message),
            }
        }
        shown
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
