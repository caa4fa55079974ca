use super::connection::{open_database, open_in_memory};
use super::models::{AttributeKind, CatalogEntry, NewEntry, Page};
use super::{CatalogStore, DatabaseError};
use crate::core::phash::Fingerprint;
use chrono::Utc;
use rusqlite::{params, Connection, Params, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const ENTRY_COLUMNS: &str =
    "id, title, source, url, size, page_count, cover_path, cover_hash, storage_dir, updated_at";

/// SQLite-backed catalog. One connection, serialized behind a mutex.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn insert_entry(&self, entry: &NewEntry) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO entries
             (title, source, url, size, page_count, cover_path, cover_hash, storage_dir, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.title,
                entry.source,
                entry.url,
                entry.size as i64,
                entry.pages.len() as i64,
                entry.cover_path,
                Fingerprint::NotComputed.to_legacy(),
                entry.storage_dir,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let attributes = entry
            .artists
            .iter()
            .enumerate()
            .map(|(position, name)| (AttributeKind::Artist, position, name))
            .chain(
                entry
                    .languages
                    .iter()
                    .enumerate()
                    .map(|(position, name)| (AttributeKind::Language, position, name)),
            );
        for (kind, position, name) in attributes {
            tx.execute(
                "INSERT INTO entry_attributes (entry_id, kind, position, name) VALUES (?1, ?2, ?3, ?4)",
                params![id, String::from(kind), position as i64, name],
            )?;
        }

        for (position, page) in entry.pages.iter().enumerate() {
            tx.execute(
                "INSERT INTO pages (entry_id, position, url, readable) VALUES (?1, ?2, ?3, ?4)",
                params![id, position as i64, page.url, page.readable],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn get_entry(&self, id: i64) -> Result<CatalogEntry, DatabaseError> {
        let conn = self.lock()?;
        select_entries(&conn, "WHERE id = ?1", params![id])?
            .into_iter()
            .next()
            .ok_or(DatabaseError::NotFound { id })
    }

    pub fn all_entries(&self) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let conn = self.lock()?;
        select_entries(&conn, "", [])
    }

    /// Point the entry at a new cover; its hash is computed again on the next index run.
    pub fn update_cover_path(&self, id: i64, cover_path: Option<&str>) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE entries SET cover_path = ?1, cover_hash = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                cover_path,
                Fingerprint::NotComputed.to_legacy(),
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound { id });
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize, DatabaseError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CatalogStore for SqliteCatalog {
    fn select_entries_needing_cover_hash(&self) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let conn = self.lock()?;
        select_entries(
            &conn,
            "WHERE cover_hash = ?1",
            params![Fingerprint::NotComputed.to_legacy()],
        )
    }

    fn persist_cover_hash(&self, entry_id: i64, hash: Fingerprint) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE entries SET cover_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![hash.to_legacy(), Utc::now().to_rfc3339(), entry_id],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound { id: entry_id });
        }
        Ok(())
    }

    fn find_by_source_and_url(
        &self,
        source: &str,
        url: &str,
    ) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let conn = self.lock()?;
        select_entries(&conn, "WHERE source = ?1 AND url = ?2", params![source, url])
    }

    fn find_by_page_count_and_size(
        &self,
        page_count: u32,
        size: u64,
    ) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let conn = self.lock()?;
        select_entries(
            &conn,
            "WHERE page_count = ?1 AND size = ?2",
            params![page_count as i64, size as i64],
        )
    }

    fn read_cover(&self, entry: &CatalogEntry) -> Result<Vec<u8>, DatabaseError> {
        let path = cover_location(entry).ok_or(DatabaseError::MissingCover { id: entry.id })?;
        Ok(fs::read(path)?)
    }
}

/// Relative cover paths are resolved against the entry's storage folder.
fn cover_location(entry: &CatalogEntry) -> Option<PathBuf> {
    let cover = PathBuf::from(entry.cover_path.as_deref().filter(|p| !p.is_empty())?);
    match &entry.storage_dir {
        Some(dir) if cover.is_relative() => Some(Path::new(dir).join(cover)),
        _ => Some(cover),
    }
}

fn select_entries<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let sql = format!("SELECT {} FROM entries {} ORDER BY id", ENTRY_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, entry_from_row)?;

    let mut entries = Vec::new();
    for row in rows {
        let mut entry = row?;
        load_attributes(conn, &mut entry)?;
        load_pages(conn, &mut entry)?;
        entries.push(entry);
    }
    Ok(entries)
}

fn entry_from_row(row: &Row) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        source: row.get(2)?,
        url: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        page_count: row.get::<_, i64>(5)? as u32,
        cover_path: row.get(6)?,
        cover_hash: Fingerprint::from_legacy(row.get(7)?),
        storage_dir: row.get(8)?,
        artists: Vec::new(),
        languages: Vec::new(),
        pages: Vec::new(),
        updated_at: row.get(9)?,
    })
}

fn load_attributes(conn: &Connection, entry: &mut CatalogEntry) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT kind, name FROM entry_attributes WHERE entry_id = ?1 ORDER BY kind, position",
    )?;
    let rows = stmt.query_map(params![entry.id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (kind, name) = row?;
        match AttributeKind::from(kind) {
            AttributeKind::Artist => entry.artists.push(name),
            AttributeKind::Language => entry.languages.push(name),
        }
    }
    Ok(())
}

fn load_pages(conn: &Connection, entry: &mut CatalogEntry) -> Result<(), DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT url, readable FROM pages WHERE entry_id = ?1 ORDER BY position")?;
    let rows = stmt.query_map(params![entry.id], |row| {
        Ok(Page {
            url: row.get(0)?,
            readable: row.get(1)?,
        })
    })?;

    for row in rows {
        entry.pages.push(row?);
    }
    Ok(())
}
