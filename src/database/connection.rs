use super::DatabaseError;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        source TEXT NOT NULL DEFAULT '',
        url TEXT NOT NULL DEFAULT '',
        size INTEGER NOT NULL DEFAULT 0,
        page_count INTEGER NOT NULL DEFAULT 0,
        cover_path TEXT,
        cover_hash INTEGER NOT NULL DEFAULT 0,
        storage_dir TEXT,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entry_attributes (
        entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        position INTEGER NOT NULL,
        name TEXT NOT NULL,
        PRIMARY KEY (entry_id, kind, position)
    );

    CREATE TABLE IF NOT EXISTS pages (
        entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        url TEXT NOT NULL,
        readable INTEGER NOT NULL DEFAULT 1,
        PRIMARY KEY (entry_id, position)
    );

    CREATE INDEX IF NOT EXISTS idx_entries_source_url ON entries(source, url);
    CREATE INDEX IF NOT EXISTS idx_entries_pages_size ON entries(page_count, size);
    CREATE INDEX IF NOT EXISTS idx_entries_cover_hash ON entries(cover_hash);
";

pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    initialize_schema(&conn)?;
    Ok(conn)
}

fn initialize_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// `<data dir>/dupefinder/catalog.db`
pub fn default_database_path() -> Result<PathBuf, DatabaseError> {
    let data_dir = dirs::data_dir().ok_or(DatabaseError::NoDataDir)?;
    Ok(data_dir.join("dupefinder").join("catalog.db"))
}
