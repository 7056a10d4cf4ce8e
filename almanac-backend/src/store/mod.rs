//! Persistence layer - composes the index database and the document store.
//!
//! Writes go stub-first, then document. The two stores are not
//! transactional: on read the document is always authoritative, so a stale
//! stub can only affect filtering granularity, never the returned entry.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::{Database, StubFilter};
use crate::documents::DocumentStore;
use crate::error::{AlmanacError, AlmanacResult};
use crate::models::{Entry, EntryKind, EntryStub};

/// Upsert/get/list/archive/delete for a single entry kind.
#[derive(Clone)]
pub struct EntryStore {
    kind: EntryKind,
    db: Arc<Database>,
    docs: DocumentStore,
}

impl EntryStore {
    pub fn new(kind: EntryKind, db: Arc<Database>, docs: DocumentStore) -> Self {
        EntryStore { kind, db, docs }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.docs
    }

    /// Insert-or-overwrite by id: stub row first, then the document.
    /// Last write wins; safe to retry.
    pub fn upsert(&self, entry: &Entry) -> AlmanacResult<()> {
        debug_assert_eq!(entry.kind(), self.kind);

        let path = self.docs.path_for(entry);
        let stub = EntryStub::project(entry, &path);
        self.db.upsert_stub(self.kind, &stub)?;
        self.docs.save(entry)?;
        Ok(())
    }

    /// Load the full entry. The stub row only locates the document; the
    /// document itself is authoritative and is always loaded.
    pub fn get_by_id(&self, id: Uuid) -> AlmanacResult<Entry> {
        let row = self
            .db
            .get_stub(self.kind, id)?
            .ok_or(AlmanacError::NotFound(id))?;
        self.docs.load(Path::new(&row.stub.document_path))
    }

    /// Index-only query; no document I/O.
    pub fn list_stubs(&self, filter: &StubFilter) -> AlmanacResult<Vec<EntryStub>> {
        self.db.list_stubs(self.kind, filter)
    }

    /// `list_stubs` plus hydration. An unreadable or corrupt document is
    /// logged and skipped; the listing still returns everything else.
    pub fn list_full(&self, filter: &StubFilter) -> AlmanacResult<Vec<Entry>> {
        let stubs = self.list_stubs(filter)?;
        let mut entries = Vec::with_capacity(stubs.len());
        for stub in stubs {
            match self.docs.load(Path::new(&stub.document_path)) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!(
                    "[STORE] Skipping {} document {}: {}",
                    self.kind,
                    stub.document_path,
                    e
                ),
            }
        }
        Ok(entries)
    }

    /// Soft-delete: mark the index row archived; the document stays intact.
    pub fn archive(&self, id: Uuid) -> AlmanacResult<()> {
        if !self.db.set_archived(self.kind, id)? {
            return Err(AlmanacError::NotFound(id));
        }
        Ok(())
    }

    /// Hard delete: remove the index row and the document. Both steps are
    /// attempted even if one fails, and both failures are reported together.
    pub fn delete(&self, id: Uuid) -> AlmanacResult<()> {
        let row = self
            .db
            .get_stub(self.kind, id)?
            .ok_or(AlmanacError::NotFound(id))?;

        let index_result = self.db.delete_stub(self.kind, id);
        let doc_result = self.docs.delete(Path::new(&row.stub.document_path));

        match (index_result, doc_result) {
            (Ok(_), Ok(())) => Ok(()),
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Err(index_err), Err(doc_err)) => Err(AlmanacError::Persistence(format!(
                "index delete failed: {index_err}; document delete failed: {doc_err}"
            ))),
        }
    }

    /// Distinct tags in use for this kind, most used first.
    pub fn tag_counts(&self) -> AlmanacResult<Vec<(String, usize)>> {
        self.db.tag_counts(self.kind)
    }
}
