//! Stub table operations (one table per entry kind)

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use super::super::Database;
use crate::error::AlmanacResult;
use crate::models::{EntryKind, EntryStub};

/// Index-only query predicates. All conditions are ANDed.
#[derive(Debug, Clone)]
pub struct StubFilter {
    /// Only rows that are neither completed nor archived.
    pub active_only: bool,
    /// Only archived rows (overrides `active_only`).
    pub archived_only: bool,
    /// Anchor within this many days from now; -1 = unbounded. Rows without
    /// an anchor always pass.
    pub within_days: i64,
    pub name_contains: Option<String>,
    pub tag_contains: Option<String>,
}

impl Default for StubFilter {
    fn default() -> Self {
        StubFilter {
            active_only: false,
            archived_only: false,
            within_days: -1,
            name_contains: None,
            tag_contains: None,
        }
    }
}

impl StubFilter {
    pub fn active() -> Self {
        StubFilter {
            active_only: true,
            ..Default::default()
        }
    }

    pub fn active_within(days: i64) -> Self {
        StubFilter {
            active_only: true,
            within_days: days,
            ..Default::default()
        }
    }

    pub fn archived() -> Self {
        StubFilter {
            archived_only: true,
            ..Default::default()
        }
    }
}

/// A stub plus the row-level archived flag (not part of the projection).
#[derive(Debug, Clone)]
pub struct StubRow {
    pub stub: EntryStub,
    pub archived: bool,
}

const STUB_COLUMNS: &str = "id, name, started, completed, archived, tags, \
     created_at, started_at, due_by, completed_at, anchor, document_path";

impl Database {
    /// Insert-or-overwrite a stub by id. The archived flag is left untouched
    /// on conflict so an update never resurrects an archived row.
    pub fn upsert_stub(&self, kind: EntryKind, stub: &EntryStub) -> AlmanacResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, name, started, completed, tags, created_at,
                 started_at, due_by, completed_at, anchor, document_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name, started = excluded.started,
                 completed = excluded.completed, tags = excluded.tags,
                 created_at = excluded.created_at, started_at = excluded.started_at,
                 due_by = excluded.due_by, completed_at = excluded.completed_at,
                 anchor = excluded.anchor, document_path = excluded.document_path",
                kind.table()
            ),
            rusqlite::params![
                stub.id.to_string(),
                stub.name,
                stub.started,
                stub.completed,
                stub.tags,
                stub.created_at,
                stub.started_at,
                stub.due_by,
                stub.completed_at,
                stub.anchor,
                stub.document_path,
            ],
        )?;
        Ok(())
    }

    pub fn get_stub(&self, kind: EntryKind, id: Uuid) -> AlmanacResult<Option<StubRow>> {
        use rusqlite::OptionalExtension;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STUB_COLUMNS} FROM {} WHERE id = ?1",
            kind.table()
        ))?;
        let row = stmt
            .query_row(rusqlite::params![id.to_string()], row_to_stub_row)
            .optional()?;
        Ok(row)
    }

    pub fn list_stubs(&self, kind: EntryKind, filter: &StubFilter) -> AlmanacResult<Vec<EntryStub>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {STUB_COLUMNS} FROM {} WHERE 1=1",
            kind.table()
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut idx = 0usize;

        if filter.archived_only {
            sql.push_str(" AND archived = 1");
        } else if filter.active_only {
            sql.push_str(" AND completed = 0 AND archived = 0");
        } else {
            sql.push_str(" AND archived = 0");
        }

        if filter.within_days >= 0 {
            let cutoff = (Utc::now() + Duration::days(filter.within_days)).timestamp();
            idx += 1;
            sql.push_str(&format!(" AND (anchor IS NULL OR anchor <= ?{idx})"));
            params.push(Box::new(cutoff));
        }

        if let Some(ref name) = filter.name_contains {
            idx += 1;
            sql.push_str(&format!(" AND name LIKE ?{idx}"));
            params.push(Box::new(format!("%{}%", name)));
        }

        if let Some(ref tag) = filter.tag_contains {
            idx += 1;
            sql.push_str(&format!(" AND tags LIKE ?{idx}"));
            params.push(Box::new(format!("%{}%", tag)));
        }

        // Anchored rows first (soonest due/start), then unanchored by recency.
        sql.push_str(
            " ORDER BY CASE WHEN anchor IS NULL THEN 1 ELSE 0 END, anchor ASC, created_at DESC",
        );

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let stubs = stmt
            .query_map(params_ref.as_slice(), |row| {
                row_to_stub_row(row).map(|r| r.stub)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(stubs)
    }

    /// Soft-delete: flag the row; the document is untouched.
    pub fn set_archived(&self, kind: EntryKind, id: Uuid) -> AlmanacResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            &format!("UPDATE {} SET archived = 1 WHERE id = ?1", kind.table()),
            rusqlite::params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_stub(&self, kind: EntryKind, id: Uuid) -> AlmanacResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            rusqlite::params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    /// Distinct tags across non-archived rows with usage counts, most used
    /// first.
    pub fn tag_counts(&self, kind: EntryKind) -> AlmanacResult<Vec<(String, usize)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT tags FROM {} WHERE archived = 0 AND tags != '[]'",
            kind.table()
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let tags: Vec<String> = serde_json::from_str(&row?).unwrap_or_default();
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut tags: Vec<(String, usize)> = counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(tags)
    }
}

fn row_to_stub_row(row: &rusqlite::Row) -> rusqlite::Result<StubRow> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(StubRow {
        stub: EntryStub {
            id,
            name: row.get(1)?,
            started: row.get(2)?,
            completed: row.get(3)?,
            tags: row.get(5)?,
            created_at: row.get(6)?,
            started_at: row.get(7)?,
            due_by: row.get(8)?,
            completed_at: row.get(9)?,
            anchor: row.get(10)?,
            document_path: row.get(11)?,
        },
        archived: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryBuilder, EntryStub};
    use std::path::Path;
    use tempfile::tempdir;

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(&dir.path().join("test.db")).expect("Failed to open database")
    }

    fn stub_for(name: &str, due_days: i64) -> EntryStub {
        let entry = EntryBuilder::task(name)
            .due_by(Utc::now() + Duration::days(due_days))
            .tag("test")
            .build()
            .unwrap();
        EntryStub::project(&entry, Path::new("documents/tasks/x.json"))
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);
        let stub = stub_for("a", 3);

        db.upsert_stub(EntryKind::Task, &stub).unwrap();
        db.upsert_stub(EntryKind::Task, &stub).unwrap();

        let listed = db.list_stubs(EntryKind::Task, &StubFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], stub);
    }

    #[test]
    fn test_upsert_preserves_archived_flag() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);
        let mut stub = stub_for("a", 3);

        db.upsert_stub(EntryKind::Task, &stub).unwrap();
        assert!(db.set_archived(EntryKind::Task, stub.id).unwrap());

        stub.name = "renamed".to_string();
        db.upsert_stub(EntryKind::Task, &stub).unwrap();

        let row = db.get_stub(EntryKind::Task, stub.id).unwrap().unwrap();
        assert!(row.archived);
        assert_eq!(row.stub.name, "renamed");
    }

    #[test]
    fn test_active_filter_excludes_completed_and_archived() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let open = stub_for("open", 1);
        let mut done = stub_for("done", 1);
        done.completed = true;
        let archived = stub_for("archived", 1);

        for s in [&open, &done, &archived] {
            db.upsert_stub(EntryKind::Task, s).unwrap();
        }
        db.set_archived(EntryKind::Task, archived.id).unwrap();

        let active = db.list_stubs(EntryKind::Task, &StubFilter::active()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);

        let archived_rows = db.list_stubs(EntryKind::Task, &StubFilter::archived()).unwrap();
        assert_eq!(archived_rows.len(), 1);
        assert_eq!(archived_rows[0].id, archived.id);
    }

    #[test]
    fn test_within_days_filter() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let soon = stub_for("soon", 2);
        let far = stub_for("far", 30);
        db.upsert_stub(EntryKind::Task, &soon).unwrap();
        db.upsert_stub(EntryKind::Task, &far).unwrap();

        let within = db
            .list_stubs(EntryKind::Task, &StubFilter::active_within(7))
            .unwrap();
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].id, soon.id);

        // -1 disables the bound
        let all = db
            .list_stubs(EntryKind::Task, &StubFilter::active_within(-1))
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_name_and_tag_substring_filters() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        db.upsert_stub(EntryKind::Task, &stub_for("water the garden", 1))
            .unwrap();
        db.upsert_stub(EntryKind::Task, &stub_for("pay rent", 1)).unwrap();

        let filter = StubFilter {
            name_contains: Some("garden".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_stubs(EntryKind::Task, &filter).unwrap().len(), 1);

        let filter = StubFilter {
            tag_contains: Some("test".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_stubs(EntryKind::Task, &filter).unwrap().len(), 2);
    }

    #[test]
    fn test_kinds_are_isolated() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        db.upsert_stub(EntryKind::Task, &stub_for("task", 1)).unwrap();
        assert!(db
            .list_stubs(EntryKind::Event, &StubFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_tag_counts() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        db.upsert_stub(EntryKind::Task, &stub_for("a", 1)).unwrap();
        db.upsert_stub(EntryKind::Task, &stub_for("b", 1)).unwrap();

        let counts = db.tag_counts(EntryKind::Task).unwrap();
        assert_eq!(counts, vec![("test".to_string(), 2)]);
    }

    #[test]
    fn test_delete_stub() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);
        let stub = stub_for("a", 1);

        db.upsert_stub(EntryKind::Task, &stub).unwrap();
        assert!(db.delete_stub(EntryKind::Task, stub.id).unwrap());
        assert!(!db.delete_stub(EntryKind::Task, stub.id).unwrap());
        assert!(db.get_stub(EntryKind::Task, stub.id).unwrap().is_none());
    }
}
