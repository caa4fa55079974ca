use crate::core::phash::Fingerprint;
use serde::{Deserialize, Serialize};

// Catalog models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub url: String,
    pub size: u64,
    pub page_count: u32,
    pub cover_path: Option<String>,
    pub cover_hash: Fingerprint,
    pub storage_dir: Option<String>,
    pub artists: Vec<String>,
    pub languages: Vec<String>,
    pub pages: Vec<Page>,
    pub updated_at: String,
}

impl CatalogEntry {
    /// Pages a reader can actually open, in reading order.
    pub fn readable_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|page| page.readable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    #[serde(default = "default_readable")]
    pub readable: bool,
}

fn default_readable() -> bool {
    true
}

/// Entry as found in an import manifest, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub cover_path: Option<String>,
    #[serde(default)]
    pub storage_dir: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

// Enums for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Artist,
    Language,
}

impl From<String> for AttributeKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "language" => AttributeKind::Language,
            _ => AttributeKind::Artist,
        }
    }
}

impl From<AttributeKind> for String {
    fn from(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::Artist => "artist".to_string(),
            AttributeKind::Language => "language".to_string(),
        }
    }
}

/// JSON sidecar written next to an entry's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub title: String,
    pub source: String,
    pub url: String,
    pub artists: Vec<String>,
    pub languages: Vec<String>,
    pub page_count: u32,
    pub size: u64,
    pub cover_hash: i64,
    pub updated_at: String,
}

impl From<&CatalogEntry> for EntryMetadata {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            title: entry.title.clone(),
            source: entry.source.clone(),
            url: entry.url.clone(),
            artists: entry.artists.clone(),
            languages: entry.languages.clone(),
            page_count: entry.page_count,
            size: entry.size,
            cover_hash: entry.cover_hash.to_legacy(),
            updated_at: entry.updated_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_kind_strings() {
        assert_eq!(String::from(AttributeKind::Language), "language");
        assert_eq!(AttributeKind::from("artist".to_string()), AttributeKind::Artist);
        assert_eq!(AttributeKind::from("language".to_string()), AttributeKind::Language);
    }

    #[test]
    fn test_manifest_entry_defaults() {
        let entry: NewEntry = serde_json::from_str(
            r#"{"title": "Foo", "pages": [{"url": "https://host/1.jpg"}]}"#,
        )
        .unwrap();

        assert_eq!(entry.title, "Foo");
        assert!(entry.artists.is_empty());
        assert!(entry.pages[0].readable);
        assert_eq!(entry.cover_path, None);
    }
}
