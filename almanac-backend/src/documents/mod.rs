//! Document store - one canonical JSON file per entry.
//!
//! Paths are a deterministic function of kind, creation year/month, and id,
//! so the same entry always maps to the same file. Documents are the
//! authoritative representation; the index only points at them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;

use crate::error::{AlmanacError, AlmanacResult};
use crate::models::Entry;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: PathBuf) -> Self {
        DocumentStore { root }
    }

    /// Deterministic path for an entry: `<root>/<kind>/<YYYY>/<MM>/<id>.json`
    pub fn path_for(&self, entry: &Entry) -> PathBuf {
        self.root
            .join(entry.kind().table())
            .join(format!("{:04}", entry.created_at.year()))
            .join(format!("{:02}", entry.created_at.month()))
            .join(format!("{}.json", entry.id))
    }

    /// Write the entry's document, creating parent directories as needed.
    pub fn save(&self, entry: &Entry) -> AlmanacResult<PathBuf> {
        let path = self.path_for(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entry)
            .map_err(|e| AlmanacError::Persistence(format!("serialize {}: {}", entry.id, e)))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Load and parse a document. Parse failures are reported as
    /// `MalformedDocument` so bulk listings can skip them.
    pub fn load(&self, path: &Path) -> AlmanacResult<Entry> {
        let content = fs::read_to_string(path).map_err(|e| {
            AlmanacError::Persistence(format!("read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| AlmanacError::MalformedDocument {
            path: path.display().to_string(),
            cause: e.to_string(),
        })
    }

    /// Remove a document file. A file that is already gone counts as deleted.
    pub fn delete(&self, path: &Path) -> AlmanacResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AlmanacError::Persistence(format!(
                "delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
