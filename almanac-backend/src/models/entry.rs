//! Entry types and builder-style construction.
//!
//! An `Entry` is the canonical, full-fidelity representation of one
//! user-created item. The common attributes live on the struct; anything
//! kind-specific lives in the tagged `EntryDetail` variant, which also makes
//! the serialized document self-describing.

use std::collections::BTreeSet;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::completion::{Completable, Subtask};
use super::reminder::{Reminder, Urgency};
use crate::error::{AlmanacError, AlmanacResult};

/// Drop sub-minute precision; all entry timestamps are minute-resolution.
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// The five entry kinds. One index table and one document subdirectory each.
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    Event,
    Task,
    Project,
    Note,
    Journal,
}

impl EntryKind {
    /// Index table name (also the document subdirectory name).
    pub fn table(&self) -> &'static str {
        match self {
            EntryKind::Event => "events",
            EntryKind::Task => "tasks",
            EntryKind::Project => "projects",
            EntryKind::Note => "notes",
            EntryKind::Journal => "journals",
        }
    }

    /// Whether elapsed entries of this kind migrate to the past partition.
    pub fn has_time_window(&self) -> bool {
        matches!(self, EntryKind::Event)
    }
}

/// Kind-specific payload. The serde tag doubles as the document's kind marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetail {
    Event {
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        location: Option<String>,
    },
    Task {
        subtasks: Vec<Subtask>,
    },
    Project {
        tasks: Vec<Subtask>,
    },
    Note {
        body: String,
    },
    Journal {
        body: String,
    },
}

impl EntryDetail {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDetail::Event { .. } => EntryKind::Event,
            EntryDetail::Task { .. } => EntryKind::Task,
            EntryDetail::Project { .. } => EntryKind::Project,
            EntryDetail::Note { .. } => EntryKind::Note,
            EntryDetail::Journal { .. } => EntryKind::Journal,
        }
    }
}

/// A user-created entry (event, task, project, note, or journal page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub due_by: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub started: bool,
    pub completed: bool,
    pub reminders: Vec<Reminder>,
    #[serde(flatten)]
    pub detail: EntryDetail,
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        self.detail.kind()
    }

    /// The time reminders are anchored to: start time for events, due time
    /// for everything else. None means the entry cannot carry reminders.
    pub fn anchor_time(&self) -> Option<DateTime<Utc>> {
        match &self.detail {
            EntryDetail::Event { starts_at, .. } => Some(*starts_at),
            _ => self.due_by,
        }
    }

    /// Effective completion: derived from children for composite kinds,
    /// the stored flag otherwise.
    pub fn is_completed(&self) -> bool {
        self.completion_status()
    }

    /// Free-form text of the entry (empty for kinds without a body).
    pub fn body(&self) -> &str {
        match &self.detail {
            EntryDetail::Note { body } | EntryDetail::Journal { body } => body,
            _ => "",
        }
    }

    pub fn mark_started(&mut self) {
        self.started = true;
        self.started_at = Some(truncate_to_minute(Utc::now()));
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.completed_at = Some(truncate_to_minute(Utc::now()));
    }
}

impl Completable for Entry {
    fn stored_completed(&self) -> bool {
        self.completed
    }

    fn children(&self) -> &[Subtask] {
        match &self.detail {
            EntryDetail::Task { subtasks } => subtasks,
            EntryDetail::Project { tasks } => tasks,
            _ => &[],
        }
    }
}

/// Builder for new entries. Defaults are applied up front; `build` validates
/// and stamps id + creation time.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    kind: EntryKind,
    name: String,
    description: String,
    tags: BTreeSet<String>,
    started_at: Option<DateTime<Utc>>,
    due_by: Option<DateTime<Utc>>,
    reminders: Vec<Reminder>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    location: Option<String>,
    subtasks: Vec<Subtask>,
    body: String,
}

impl EntryBuilder {
    fn new(kind: EntryKind, name: &str) -> Self {
        EntryBuilder {
            kind,
            name: name.to_string(),
            description: String::new(),
            tags: BTreeSet::new(),
            started_at: None,
            due_by: None,
            reminders: Vec::new(),
            starts_at: None,
            ends_at: None,
            location: None,
            subtasks: Vec::new(),
            body: String::new(),
        }
    }

    pub fn event(name: &str, starts_at: DateTime<Utc>) -> Self {
        let mut b = Self::new(EntryKind::Event, name);
        b.starts_at = Some(truncate_to_minute(starts_at));
        b
    }

    pub fn task(name: &str) -> Self {
        Self::new(EntryKind::Task, name)
    }

    pub fn project(name: &str) -> Self {
        Self::new(EntryKind::Project, name)
    }

    pub fn note(name: &str) -> Self {
        Self::new(EntryKind::Note, name)
    }

    pub fn journal(name: &str) -> Self {
        Self::new(EntryKind::Journal, name)
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn due_by(mut self, due_by: DateTime<Utc>) -> Self {
        self.due_by = Some(truncate_to_minute(due_by));
        self
    }

    pub fn ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = Some(truncate_to_minute(ends_at));
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn reminder(mut self, fire_at: DateTime<Utc>, urgency: Urgency) -> Self {
        self.reminders.push(Reminder::new(fire_at, urgency));
        self
    }

    pub fn build(self) -> AlmanacResult<Entry> {
        if self.name.trim().is_empty() {
            return Err(AlmanacError::InvalidEntry("name must not be empty".into()));
        }

        let detail = match self.kind {
            EntryKind::Event => {
                let starts_at = self.starts_at.ok_or_else(|| {
                    AlmanacError::InvalidEntry("event requires a start time".into())
                })?;
                if let Some(ends_at) = self.ends_at {
                    if ends_at < starts_at {
                        return Err(AlmanacError::InvalidEntry(
                            "event end time precedes start time".into(),
                        ));
                    }
                }
                EntryDetail::Event {
                    starts_at,
                    ends_at: self.ends_at,
                    location: self.location,
                }
            }
            EntryKind::Task => EntryDetail::Task {
                subtasks: self.subtasks,
            },
            EntryKind::Project => EntryDetail::Project {
                tasks: self.subtasks,
            },
            EntryKind::Note => EntryDetail::Note { body: self.body },
            EntryKind::Journal => EntryDetail::Journal { body: self.body },
        };

        let anchor = match &detail {
            EntryDetail::Event { starts_at, .. } => Some(*starts_at),
            _ => self.due_by,
        };

        if !self.reminders.is_empty() {
            let anchor = anchor.ok_or_else(|| {
                AlmanacError::InvalidEntry(
                    "reminders require a due or start time to anchor to".into(),
                )
            })?;
            for reminder in &self.reminders {
                if reminder.fire_at > anchor {
                    return Err(AlmanacError::InvalidEntry(format!(
                        "reminder at {} is later than the anchor time {}",
                        reminder.fire_at, anchor
                    )));
                }
            }
        }

        Ok(Entry {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            tags: self.tags,
            created_at: truncate_to_minute(Utc::now()),
            started_at: self.started_at,
            due_by: self.due_by,
            completed_at: None,
            started: false,
            completed: false,
            reminders: self.reminders,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_truncate_to_minute() {
        let dt = Utc::now();
        let truncated = truncate_to_minute(dt);
        assert_eq!(truncated.second(), 0);
        assert_eq!(truncated.nanosecond(), 0);
    }

    #[test]
    fn test_builder_defaults() {
        let task = EntryBuilder::task("write report").build().unwrap();
        assert_eq!(task.kind(), EntryKind::Task);
        assert!(!task.started);
        assert!(!task.completed);
        assert!(task.reminders.is_empty());
        assert_eq!(task.created_at.second(), 0);
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        assert!(EntryBuilder::task("  ").build().is_err());
    }

    #[test]
    fn test_builder_rejects_reminder_without_anchor() {
        let result = EntryBuilder::task("t")
            .reminder(Utc::now() + Duration::hours(1), Urgency::Normal)
            .build();
        assert!(matches!(result, Err(AlmanacError::InvalidEntry(_))));
    }

    #[test]
    fn test_builder_rejects_reminder_past_anchor() {
        let due = Utc::now() + Duration::days(1);
        let result = EntryBuilder::task("t")
            .due_by(due)
            .reminder(due + Duration::hours(1), Urgency::Normal)
            .build();
        assert!(matches!(result, Err(AlmanacError::InvalidEntry(_))));
    }

    #[test]
    fn test_event_anchor_is_start_time() {
        let starts = Utc::now() + Duration::days(2);
        let event = EntryBuilder::event("standup", starts).build().unwrap();
        assert_eq!(event.anchor_time(), Some(truncate_to_minute(starts)));
    }

    #[test]
    fn test_derived_completion_from_subtasks() {
        let task = EntryBuilder::task("release")
            .due_by(Utc::now() + Duration::days(3))
            .subtask(Subtask::done("tag"))
            .subtask(Subtask::new("announce"))
            .build()
            .unwrap();
        assert!(!task.is_completed());

        let mut task = task;
        if let EntryDetail::Task { subtasks } = &mut task.detail {
            subtasks[1].completed = true;
        }
        // Stored flag is still false; children decide.
        assert!(!task.completed);
        assert!(task.is_completed());
    }

    #[test]
    fn test_document_round_trips_through_json() {
        let entry = EntryBuilder::event("demo", Utc::now() + Duration::days(1))
            .description("quarterly demo")
            .tag("work")
            .reminder(Utc::now() + Duration::hours(12), Urgency::Critical)
            .build()
            .unwrap();

        let json = serde_json::to_string_pretty(&entry).unwrap();
        assert!(json.contains("\"kind\": \"event\""));
        let loaded: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, entry);
    }
}
