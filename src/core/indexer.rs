use crate::config::DuplicateConfig;
use crate::core::image::{DecodeError, ImageDecoder};
use crate::core::phash::{Fingerprint, HashError, PerceptualHasher};
use crate::core::{call_safely, ProgressCallback};
use crate::database::models::CatalogEntry;
use crate::database::sidecar::write_sidecar;
use crate::database::{CatalogStore, DatabaseError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Could not list entries to index: {0}")]
    Select(#[source] DatabaseError),

    #[error("Entry {entry_id}: cover unreadable: {source}")]
    CoverRead {
        entry_id: i64,
        source: DatabaseError,
    },

    #[error("Entry {entry_id}: cover could not be decoded: {source}")]
    Decode { entry_id: i64, source: DecodeError },

    #[error("Entry {entry_id}: hash computation error: {source}")]
    Hash { entry_id: i64, source: HashError },

    #[error("Entry {entry_id}: hash could not be saved: {source}")]
    Persist {
        entry_id: i64,
        source: DatabaseError,
    },
}

impl IndexError {
    pub fn entry_id(&self) -> Option<i64> {
        match self {
            IndexError::Select(_) => None,
            IndexError::CoverRead { entry_id, .. }
            | IndexError::Decode { entry_id, .. }
            | IndexError::Hash { entry_id, .. }
            | IndexError::Persist { entry_id, .. } => Some(*entry_id),
        }
    }
}

pub type InfoCallback = Box<dyn Fn(&CatalogEntry) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(IndexError) + Send + Sync>;

/// Callbacks for a batch run. All optional.
#[derive(Default)]
pub struct IndexObserver {
    info: Option<InfoCallback>,
    progress: Option<ProgressCallback>,
    error: Option<ErrorCallback>,
}

impl IndexObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before each entry is processed.
    pub fn on_info(mut self, callback: InfoCallback) -> Self {
        self.info = Some(callback);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.error = Some(callback);
        self
    }

    fn info(&self, entry: &CatalogEntry) {
        if let Some(callback) = &self.info {
            call_safely("Index info", || callback(entry));
        }
    }

    fn progress(&self, completed: usize, total: usize) {
        if let Some(callback) = &self.progress {
            call_safely("Index progress", || callback(completed, total));
        }
    }

    fn error(&self, error: IndexError) {
        match &self.error {
            Some(callback) => call_safely("Index error", || callback(error)),
            None => log::warn!("{}", error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub processed: usize,
    pub hashed: usize,
    pub undecodable: usize,
    pub failed: usize,
    pub stopped: bool,
}

/// Computes and stores cover fingerprints for every entry that lacks one.
///
/// Runs sequentially and yields to the runtime between entries. A run can be
/// resumed at any time: entries already hashed are no longer selected.
pub struct CoverIndexer {
    hasher: PerceptualHasher,
    write_sidecar: bool,
    cancellation_token: Arc<AtomicBool>,
}

impl CoverIndexer {
    pub fn new(hasher: PerceptualHasher) -> Self {
        Self {
            hasher,
            write_sidecar: true,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &DuplicateConfig) -> Result<Self, HashError> {
        let hasher = PerceptualHasher::new(config.hashing.resolution, config.hashing.bit_depth)?;
        Ok(Self::new(hasher).with_sidecar(config.write_sidecar))
    }

    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.write_sidecar = enabled;
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    /// Ends the current run (or the next one) after the entry in progress.
    /// The request is consumed by the run it stops.
    pub fn stop(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub async fn index_covers(
        &self,
        store: &dyn CatalogStore,
        decoder: &dyn ImageDecoder,
        observer: &IndexObserver,
    ) -> Result<IndexReport, IndexError> {
        let entries = store
            .select_entries_needing_cover_hash()
            .map_err(IndexError::Select)?;
        let total = entries.len();
        let mut report = IndexReport::default();

        log::info!("Indexing covers of {} entries", total);

        for (index, entry) in entries.iter().enumerate() {
            observer.info(entry);

            let (fingerprint, failure) = match self.fingerprint_cover(entry, store, decoder) {
                Ok(bits) => (Fingerprint::Value(bits), None),
                Err(e) => (Fingerprint::Undecodable, Some(e)),
            };

            match store.persist_cover_hash(entry.id, fingerprint) {
                Ok(()) => {
                    if fingerprint == Fingerprint::Undecodable {
                        report.undecodable += 1;
                    } else {
                        report.hashed += 1;
                    }
                    self.refresh_sidecar(entry, fingerprint);
                }
                Err(e) => {
                    report.failed += 1;
                    observer.error(IndexError::Persist {
                        entry_id: entry.id,
                        source: e,
                    });
                }
            }
            if let Some(e) = failure {
                log::warn!("{}", e);
                observer.error(e);
            }

            report.processed += 1;
            observer.progress(index + 1, total);

            tokio::task::yield_now().await;

            if self.cancellation_token.load(Ordering::Relaxed) {
                log::info!("Indexing stopped after {} of {} entries", report.processed, total);
                report.stopped = true;
                self.cancellation_token.store(false, Ordering::Relaxed);
                break;
            }
        }

        observer.progress(report.processed, total);

        log::info!(
            "Indexed {} entries: {} hashed, {} undecodable, {} failed",
            report.processed,
            report.hashed,
            report.undecodable,
            report.failed
        );
        Ok(report)
    }

    fn fingerprint_cover(
        &self,
        entry: &CatalogEntry,
        store: &dyn CatalogStore,
        decoder: &dyn ImageDecoder,
    ) -> Result<u64, IndexError> {
        let entry_id = entry.id;
        let bytes = store
            .read_cover(entry)
            .map_err(|source| IndexError::CoverRead { entry_id, source })?;
        let sample = decoder
            .decode_grayscale_square(&bytes, self.hasher.resolution())
            .map_err(|source| IndexError::Decode { entry_id, source })?;
        self.hasher
            .compute_fingerprint(&sample)
            .map_err(|source| IndexError::Hash { entry_id, source })
    }

    fn refresh_sidecar(&self, entry: &CatalogEntry, fingerprint: Fingerprint) {
        if !self.write_sidecar {
            return;
        }

        let mut updated = entry.clone();
        updated.cover_hash = fingerprint;
        updated.updated_at = chrono::Utc::now().to_rfc3339();
        if let Err(e) = write_sidecar(&updated) {
            log::warn!("Failed to update metadata of entry {}: {}", entry.id, e);
        }
    }
}
