//! SQLite index database behind an r2d2 connection pool.
//!
//! One stub table per entry kind. SQLite in WAL mode supports one writer
//! plus concurrent readers, so a small pool keeps resync jobs and manager
//! calls from serializing behind a single connection.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use strum::IntoEnumIterator;

use crate::error::AlmanacResult;
use crate::models::EntryKind;

const POOL_SIZE: u32 = 4;

pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub struct Database {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(path: &Path) -> AlmanacResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
            )
        });
        let pool = r2d2::Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Database { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> AlmanacResult<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create the per-kind stub tables. Schema is identical across kinds;
    /// only the table name differs.
    fn run_migrations(&self) -> AlmanacResult<()> {
        let conn = self.conn()?;
        for kind in EntryKind::iter() {
            let table = kind.table();
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    started INTEGER NOT NULL DEFAULT 0,
                    completed INTEGER NOT NULL DEFAULT 0,
                    archived INTEGER NOT NULL DEFAULT 0,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at INTEGER NOT NULL,
                    started_at INTEGER,
                    due_by INTEGER,
                    completed_at INTEGER,
                    anchor INTEGER,
                    document_path TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_anchor ON {table}(anchor);
                CREATE INDEX IF NOT EXISTS idx_{table}_archived ON {table}(archived);"
            ))?;
        }
        log::debug!("[DB] Migrations complete");
        Ok(())
    }
}
