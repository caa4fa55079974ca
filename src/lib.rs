//! Duplicate detection for media libraries.
//!
//! Entries are compared on three signals: a perceptual hash of the cover,
//! the normalized title (with chapter numbers taken into account) and the
//! artist list, gated by language. Exact duplicates are found separately by
//! source URL or by page layout.

pub mod config;
pub mod core;
pub mod database;

pub use crate::config::{DuplicateConfig, Sensitivity, SignalFlags};
pub use crate::core::candidate::{build_candidates, DuplicateCandidate};
pub use crate::core::duplicate::{
    score, score_pair, DuplicateEntry, ScoreOutcome, ScoringContext, SignalScore,
};
pub use crate::core::exact::{find_duplicate_by_page_count_and_size, find_duplicate_by_url};
pub use crate::core::indexer::{CoverIndexer, IndexObserver, IndexReport};
pub use crate::core::phash::{Fingerprint, PerceptualHasher};
pub use crate::core::scanner::{DuplicateScanner, ScanReport};
pub use crate::core::title::{extract_chapter_bounds, simplify};
pub use crate::database::{CatalogStore, SqliteCatalog};
