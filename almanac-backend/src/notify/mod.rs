//! Notification delivery seam.
//!
//! The scheduling engine only knows the `Notifier` trait; delivery is
//! fire-and-forget and failures are the caller's to log. Ships a desktop
//! implementation (notify-rust) and a log-only fallback for headless runs.

use async_trait::async_trait;

use crate::error::{AlmanacError, AlmanacResult};
use crate::models::Urgency;

/// A fully rendered notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub urgency: Urgency,
    pub fade_secs: u32,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> AlmanacResult<()>;
}

/// Desktop notifications via the platform notification daemon.
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, notification: Notification) -> AlmanacResult<()> {
        // notify-rust blocks on the session bus; keep it off the timer tasks.
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&notification.title)
                .body(&notification.body)
                .icon(&notification.icon)
                .urgency(match notification.urgency {
                    Urgency::Low => notify_rust::Urgency::Low,
                    Urgency::Normal => notify_rust::Urgency::Normal,
                    Urgency::Critical => notify_rust::Urgency::Critical,
                })
                .timeout(notify_rust::Timeout::Milliseconds(
                    notification.fade_secs.saturating_mul(1000),
                ))
                .show()
                .map(|_| ())
                .map_err(|e| AlmanacError::Notify(e.to_string()))
        })
        .await
        .map_err(|e| AlmanacError::Notify(format!("notify task panicked: {e}")))?
    }
}

/// Log-only delivery for environments without a notification daemon.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> AlmanacResult<()> {
        log::info!(
            "[NOTIFY] ({}) {}: {}",
            notification.urgency,
            notification.title,
            notification.body
        );
        Ok(())
    }
}
