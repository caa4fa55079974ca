use crate::database::models::CatalogEntry;
use crate::database::{CatalogStore, DatabaseError};

/// Another entry downloaded from the same source URL with the same pages.
pub fn find_duplicate_by_url(
    entry: &CatalogEntry,
    store: &dyn CatalogStore,
) -> Result<Option<CatalogEntry>, DatabaseError> {
    if entry.url.is_empty() {
        return Ok(None);
    }
    let candidates = store.find_by_source_and_url(&entry.source, &entry.url)?;
    Ok(first_confirmed(entry, candidates))
}

/// Another entry with the same page count, byte size and pages.
pub fn find_duplicate_by_page_count_and_size(
    entry: &CatalogEntry,
    store: &dyn CatalogStore,
) -> Result<Option<CatalogEntry>, DatabaseError> {
    let candidates = store.find_by_page_count_and_size(entry.page_count, entry.size)?;
    Ok(first_confirmed(entry, candidates))
}

fn first_confirmed(entry: &CatalogEntry, candidates: Vec<CatalogEntry>) -> Option<CatalogEntry> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.id != entry.id)
        .find(|candidate| all_pages_match(entry, candidate))
}

/// Readable pages agree one to one, in order, by URL.
pub fn all_pages_match(a: &CatalogEntry, b: &CatalogEntry) -> bool {
    let pages_a: Vec<&str> = a.readable_pages().map(|p| p.url.as_str()).collect();
    let pages_b: Vec<&str> = b.readable_pages().map(|p| p.url.as_str()).collect();
    pages_a == pages_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewEntry, Page};
    use crate::database::SqliteCatalog;

    fn pages(urls: &[&str]) -> Vec<Page> {
        urls.iter()
            .map(|url| Page {
                url: url.to_string(),
                readable: true,
            })
            .collect()
    }

    fn new_entry(url: &str, page_urls: &[&str]) -> NewEntry {
        NewEntry {
            title: "Foo".to_string(),
            source: "example".to_string(),
            url: url.to_string(),
            size: 500,
            cover_path: None,
            storage_dir: None,
            artists: Vec::new(),
            languages: Vec::new(),
            pages: pages(page_urls),
        }
    }

    #[test]
    fn test_same_pages_same_order() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let original = catalog.insert_entry(&new_entry("/g/1", &["p1", "p2"])).unwrap();
        let copy = catalog.insert_entry(&new_entry("/g/1", &["p1", "p2"])).unwrap();

        let entry = catalog.get_entry(copy).unwrap();
        let found = find_duplicate_by_url(&entry, &catalog).unwrap().unwrap();
        assert_eq!(found.id, original);

        let found = find_duplicate_by_page_count_and_size(&entry, &catalog)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, original);
    }

    #[test]
    fn test_reordered_pages_do_not_match() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.insert_entry(&new_entry("/g/1", &["p1", "p2"])).unwrap();
        let copy = catalog.insert_entry(&new_entry("/g/1", &["p2", "p1"])).unwrap();

        let entry = catalog.get_entry(copy).unwrap();
        assert!(find_duplicate_by_url(&entry, &catalog).unwrap().is_none());
        assert!(find_duplicate_by_page_count_and_size(&entry, &catalog)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unreadable_pages_are_ignored() {
        let mut a = new_entry("/g/1", &["p1", "p2"]);
        a.pages.push(Page {
            url: "ad.jpg".to_string(),
            readable: false,
        });
        let b = new_entry("/g/1", &["p1", "p2"]);

        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let a = catalog.get_entry(catalog.insert_entry(&a).unwrap()).unwrap();
        let b = catalog.get_entry(catalog.insert_entry(&b).unwrap()).unwrap();

        assert!(all_pages_match(&a, &b));
        assert_eq!(find_duplicate_by_url(&a, &catalog).unwrap().unwrap().id, b.id);
    }

    #[test]
    fn test_entry_does_not_match_itself() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let id = catalog.insert_entry(&new_entry("/g/1", &["p1"])).unwrap();

        let entry = catalog.get_entry(id).unwrap();
        assert!(find_duplicate_by_url(&entry, &catalog).unwrap().is_none());
        assert!(find_duplicate_by_page_count_and_size(&entry, &catalog)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_different_page_count() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.insert_entry(&new_entry("/g/1", &["p1", "p2"])).unwrap();
        let other = catalog.insert_entry(&new_entry("/g/2", &["p1"])).unwrap();

        let entry = catalog.get_entry(other).unwrap();
        assert!(find_duplicate_by_page_count_and_size(&entry, &catalog)
            .unwrap()
            .is_none());
    }
}
