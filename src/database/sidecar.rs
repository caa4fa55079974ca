use super::models::{CatalogEntry, EntryMetadata};
use super::DatabaseError;
use std::fs;
use std::path::{Path, PathBuf};

pub const SIDECAR_FILE_NAME: &str = "metadata.json";

/// Write `metadata.json` into the entry's storage folder.
///
/// Returns `None` for entries without a storage folder. The folder itself is
/// never created here.
pub fn write_sidecar(entry: &CatalogEntry) -> Result<Option<PathBuf>, DatabaseError> {
    let Some(dir) = entry.storage_dir.as_deref() else {
        return Ok(None);
    };

    let path = Path::new(dir).join(SIDECAR_FILE_NAME);
    let json = serde_json::to_string_pretty(&EntryMetadata::from(entry))?;
    fs::write(&path, json)?;
    Ok(Some(path))
}

pub fn read_sidecar(dir: &Path) -> Result<EntryMetadata, DatabaseError> {
    let content = fs::read_to_string(dir.join(SIDECAR_FILE_NAME))?;
    Ok(serde_json::from_str(&content)?)
}
