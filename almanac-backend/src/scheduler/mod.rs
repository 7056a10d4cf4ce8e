//! Reminder scheduling engine.
//!
//! Converts an entry's reminder list into cancellable deferred notification
//! tasks keyed by (entry id, fire time). Handles live only in memory; after
//! a restart the managers' resync path rebuilds them from persisted state.
//!
//! Per-key state machine: Unscheduled -> Scheduled -> Fired | Cancelled.
//! The timer task removes its own registry entry when it fires; `cancel_all`
//! removes it on early cancellation. Both paths are safe to race - the worst
//! case is one duplicate or missed delivery, which is tolerated and never
//! retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{Entry, EntryKind, Reminder};
use crate::notify::{Notification, Notifier};

/// Registry key: at most one live handle per (entry, fire time) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReminderKey {
    entry_id: Uuid,
    fire_at: DateTime<Utc>,
}

struct LiveHandle {
    token: CancellationToken,
}

pub struct ReminderScheduler {
    handles: Arc<DashMap<ReminderKey, LiveHandle>>,
    notifier: Arc<dyn Notifier>,
    fade_secs: u32,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, fade_secs: u32) -> Self {
        ReminderScheduler {
            handles: Arc::new(DashMap::new()),
            notifier,
            fade_secs,
        }
    }

    /// Arm a timer for every reminder whose fire time is still in the
    /// future and has no live handle yet. Elapsed reminders are silently
    /// skipped - loading a backlog of overdue entries must not produce a
    /// notification storm. Returns the number of newly armed timers.
    pub fn schedule(&self, entry: &Entry) -> usize {
        let now = Utc::now();
        let mut armed = 0;

        for reminder in &entry.reminders {
            if reminder.fire_at <= now {
                log::debug!(
                    "[SCHEDULER] Skipping elapsed reminder for '{}' at {}",
                    entry.name,
                    reminder.fire_at
                );
                continue;
            }

            let key = ReminderKey {
                entry_id: entry.id,
                fire_at: reminder.fire_at,
            };
            match self.handles.entry(key) {
                Slot::Occupied(_) => continue,
                Slot::Vacant(slot) => {
                    let token = CancellationToken::new();
                    slot.insert(LiveHandle {
                        token: token.clone(),
                    });
                    self.spawn_timer(key, token, notification_for(entry, reminder, self.fade_secs), now);
                    armed += 1;
                }
            }
        }

        armed
    }

    /// Cancel and remove every live handle for an entry. Cancelling an id
    /// with no handles (or a handle that already fired) is a no-op, not an
    /// error. Returns how many handles were cancelled.
    pub fn cancel_all(&self, entry_id: Uuid) -> usize {
        let keys: Vec<ReminderKey> = self
            .handles
            .iter()
            .filter(|h| h.key().entry_id == entry_id)
            .map(|h| *h.key())
            .collect();

        let mut cancelled = 0;
        for key in keys {
            if let Some((_, handle)) = self.handles.remove(&key) {
                handle.token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// The only path mutations flow through: drop every old handle, then
    /// arm from the entry's current reminder list. Guarantees no orphaned
    /// timer can reference a stale reminder value.
    pub fn reschedule(&self, entry: &Entry) -> usize {
        self.cancel_all(entry.id);
        self.schedule(entry)
    }

    /// Cancel everything (shutdown path).
    pub fn shutdown(&self) {
        let keys: Vec<ReminderKey> = self.handles.iter().map(|h| *h.key()).collect();
        for key in keys {
            if let Some((_, handle)) = self.handles.remove(&key) {
                handle.token.cancel();
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.handles.len()
    }

    pub fn live_count_for(&self, entry_id: Uuid) -> usize {
        self.handles
            .iter()
            .filter(|h| h.key().entry_id == entry_id)
            .count()
    }

    pub fn has_handle(&self, entry_id: Uuid, fire_at: DateTime<Utc>) -> bool {
        self.handles.contains_key(&ReminderKey { entry_id, fire_at })
    }

    fn spawn_timer(
        &self,
        key: ReminderKey,
        token: CancellationToken,
        notification: Notification,
        now: DateTime<Utc>,
    ) {
        let delay = (key.fire_at - now).to_std().unwrap_or_default();
        let handles = Arc::clone(&self.handles);
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Retire first so a concurrent cancel_all finds nothing.
                    handles.remove(&key);
                    if let Err(e) = notifier.notify(notification).await {
                        log::warn!(
                            "[SCHEDULER] Notification delivery failed for {}: {}",
                            key.entry_id,
                            e
                        );
                    }
                }
            }
        });
    }
}

fn notification_for(entry: &Entry, reminder: &Reminder, fade_secs: u32) -> Notification {
    let when = entry.anchor_time().unwrap_or(reminder.fire_at);
    let body = match entry.kind() {
        EntryKind::Event => format!("Starts {}", when.format("%Y-%m-%d %H:%M")),
        EntryKind::Task | EntryKind::Project => format!("Due {}", when.format("%Y-%m-%d %H:%M")),
        EntryKind::Note | EntryKind::Journal => {
            if entry.description.is_empty() {
                format!("Reminder for {}", entry.name)
            } else {
                entry.description.clone()
            }
        }
    };

    Notification {
        title: entry.name.clone(),
        body,
        icon: icon_for(entry),
        urgency: reminder.urgency,
        fade_secs,
    }
}

/// A tag prefixed `icon:` overrides the per-kind default icon.
fn icon_for(entry: &Entry) -> String {
    entry
        .tags
        .iter()
        .find_map(|t| t.strip_prefix("icon:"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            match entry.kind() {
                EntryKind::Event => "appointment-soon",
                EntryKind::Task => "task-due",
                EntryKind::Project => "folder",
                EntryKind::Note | EntryKind::Journal => "accessories-text-editor",
            }
            .to_string()
        })
}
