//! Index projection of an entry.
//!
//! A stub is the lossy, flattened row stored in the index database. It is a
//! pure function of the entry plus the deterministic document path, so a
//! stub re-derived from a freshly loaded document always equals the row the
//! index holds. The archived flag lives on the index row only and is not
//! part of the projection.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::Entry;

fn epoch(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStub {
    pub id: Uuid,
    pub name: String,
    pub started: bool,
    /// Effective completion (derived from children for composite kinds).
    pub completed: bool,
    /// Sorted tag list serialized as a JSON array.
    pub tags: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub due_by: Option<i64>,
    pub completed_at: Option<i64>,
    /// Anchor time as epoch seconds; drives the look-forward horizon filter.
    pub anchor: Option<i64>,
    pub document_path: String,
}

impl EntryStub {
    /// Project an entry into its index row.
    pub fn project(entry: &Entry, document_path: &Path) -> Self {
        EntryStub {
            id: entry.id,
            name: entry.name.clone(),
            started: entry.started,
            completed: entry.is_completed(),
            tags: serde_json::to_string(&entry.tags).unwrap_or_else(|_| "[]".to_string()),
            created_at: epoch(entry.created_at),
            started_at: entry.started_at.map(epoch),
            due_by: entry.due_by.map(epoch),
            completed_at: entry.completed_at.map(epoch),
            anchor: entry.anchor_time().map(epoch),
            document_path: document_path.to_string_lossy().to_string(),
        }
    }

    /// Deserialized tag list (empty on malformed rows).
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}
