use crate::config::DuplicateConfig;
use crate::core::candidate::DuplicateCandidate;
use crate::core::duplicate::{score, DuplicateEntry, RejectReason, ScoreOutcome, ScoringContext};
use crate::core::text::{TextComparator, TextSimilarity};
use crate::core::{call_safely, ProgressCallback};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Sorted by descending total, then by ids.
    pub duplicates: Vec<DuplicateEntry>,
    pub compared_pairs: usize,
    pub deferred_pairs: usize,
    pub language_rejections: usize,
    pub stopped: bool,
}

/// Scores every unordered pair of a candidate list.
pub struct DuplicateScanner {
    context: ScoringContext,
    text: Box<dyn TextSimilarity>,
    progress_callback: Option<ProgressCallback>,
    cancellation_token: Arc<AtomicBool>,
}

impl DuplicateScanner {
    pub fn new(context: ScoringContext) -> Self {
        Self {
            context,
            text: Box::new(TextComparator::default()),
            progress_callback: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &DuplicateConfig) -> Self {
        Self::new(ScoringContext::from_config(config))
            .with_text_similarity(config.text_comparator)
    }

    pub fn with_text_similarity<T: TextSimilarity + 'static>(mut self, text: T) -> Self {
        self.text = Box::new(text);
        self
    }

    /// Reported once per finished reference row.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel_scan(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    pub fn scan(&self, candidates: &[DuplicateCandidate]) -> ScanReport {
        let total_rows = candidates.len();
        let completed_rows = AtomicUsize::new(0);
        let compared = AtomicUsize::new(0);
        let deferred = AtomicUsize::new(0);
        let language_rejections = AtomicUsize::new(0);

        let rows: Vec<Vec<DuplicateEntry>> = (0..total_rows)
            .into_par_iter()
            .map(|i| {
                if self.cancellation_token.load(Ordering::Relaxed) {
                    return Vec::new();
                }

                let reference = &candidates[i];
                let mut found = Vec::new();
                for candidate in &candidates[i + 1..] {
                    match score(reference, candidate, &self.context, self.text.as_ref()) {
                        ScoreOutcome::Duplicate(entry) => found.push(entry),
                        ScoreOutcome::Deferred => {
                            deferred.fetch_add(1, Ordering::Relaxed);
                        }
                        ScoreOutcome::Rejected(RejectReason::LanguageMismatch) => {
                            language_rejections.fetch_add(1, Ordering::Relaxed);
                        }
                        ScoreOutcome::Rejected(RejectReason::BelowThreshold) => {}
                    }
                }
                compared.fetch_add(total_rows - i - 1, Ordering::Relaxed);

                let done = completed_rows.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = &self.progress_callback {
                    call_safely("Scan progress", || callback(done, total_rows));
                }
                found
            })
            .collect();

        let mut duplicates: Vec<DuplicateEntry> = rows.into_iter().flatten().collect();
        duplicates.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(CmpOrdering::Equal)
                .then(a.reference_id.cmp(&b.reference_id))
                .then(a.candidate_id.cmp(&b.candidate_id))
        });

        let report = ScanReport {
            duplicates,
            compared_pairs: compared.into_inner(),
            deferred_pairs: deferred.into_inner(),
            language_rejections: language_rejections.into_inner(),
            stopped: self.cancellation_token.load(Ordering::Relaxed),
        };

        log::info!(
            "Scanned {} candidates: {} duplicate pairs, {} deferred",
            total_rows,
            report.duplicates.len(),
            report.deferred_pairs
        );
        report
    }
}
