pub mod catalog;
pub mod connection;
pub mod models;
pub mod sidecar;

use crate::core::phash::Fingerprint;
use models::CatalogEntry;
use thiserror::Error;

pub use catalog::SqliteCatalog;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entry {id} not found")]
    NotFound { id: i64 },

    #[error("Entry {id} has no cover file")]
    MissingCover { id: i64 },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("No data directory available for the default database path")]
    NoDataDir,
}

/// Storage the duplicate engine reads from and writes cover hashes to.
///
/// Writes to one entry are expected to come from a single writer at a time;
/// implementations own any locking.
pub trait CatalogStore: Send + Sync {
    /// Entries whose cover has never been hashed, or whose cover changed since.
    fn select_entries_needing_cover_hash(&self) -> Result<Vec<CatalogEntry>, DatabaseError>;

    fn persist_cover_hash(&self, entry_id: i64, hash: Fingerprint) -> Result<(), DatabaseError>;

    fn find_by_source_and_url(
        &self,
        source: &str,
        url: &str,
    ) -> Result<Vec<CatalogEntry>, DatabaseError>;

    fn find_by_page_count_and_size(
        &self,
        page_count: u32,
        size: u64,
    ) -> Result<Vec<CatalogEntry>, DatabaseError>;

    /// Raw bytes of the entry's cover image.
    fn read_cover(&self, entry: &CatalogEntry) -> Result<Vec<u8>, DatabaseError>;
}
