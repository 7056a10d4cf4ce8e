use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification urgency, passed through to the delivery backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Normal
    }
}

/// A scheduled notification attached to an entry.
///
/// `fire_at` is minute-truncated and never later than the entry's anchor
/// time (start time for events, due time otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub fire_at: DateTime<Utc>,
    #[serde(default)]
    pub urgency: Urgency,
}

impl Reminder {
    pub fn new(fire_at: DateTime<Utc>, urgency: Urgency) -> Self {
        Reminder {
            fire_at: super::entry::truncate_to_minute(fire_at),
            urgency,
        }
    }
}
