// Pairwise duplicate scoring
//
// Each enabled signal (title, cover, artist) yields a score in [0, 1] or is
// excluded for lack of data. The total is the weighted mean of the signals
// that took part, and a verdict exists only when the total clears the
// sensitivity's threshold.

use crate::config::{DuplicateConfig, ScoreWeights, Sensitivity, SignalFlags, ThresholdRow};
use crate::core::candidate::DuplicateCandidate;
use crate::core::phash::{fingerprint_bits, Fingerprint, DEFAULT_BIT_DEPTH};
use crate::core::text::TextSimilarity;
use serde::{Deserialize, Serialize};

/// Above this, two titles are considered equal outright.
const NEAR_IDENTICAL_TITLE: f64 = 0.995;

/// Minimum gain from stripping chapter markers before the chapter numbers are consulted.
const CHAPTER_STRIP_GAIN: f64 = 0.01;

/// Score of a single signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "f32", from = "f32")]
pub enum SignalScore {
    /// Not enough data on one side; left out of the total.
    Excluded,
    /// Compared, but under the signal's own threshold. Counts as 0.
    BelowThreshold,
    Value(f32),
}

impl SignalScore {
    /// Contribution to the total, `None` when excluded.
    pub fn value(self) -> Option<f32> {
        match self {
            SignalScore::Excluded => None,
            SignalScore::BelowThreshold => Some(0.0),
            SignalScore::Value(v) => Some(v),
        }
    }

    pub fn is_excluded(self) -> bool {
        matches!(self, SignalScore::Excluded)
    }

    pub fn to_legacy(self) -> f32 {
        match self {
            SignalScore::Excluded => -1.0,
            SignalScore::BelowThreshold => 0.0,
            SignalScore::Value(v) => v,
        }
    }

    pub fn from_legacy(raw: f32) -> Self {
        if raw < 0.0 {
            SignalScore::Excluded
        } else if raw == 0.0 {
            SignalScore::BelowThreshold
        } else {
            SignalScore::Value(raw)
        }
    }
}

impl From<SignalScore> for f32 {
    fn from(score: SignalScore) -> Self {
        score.to_legacy()
    }
}

impl From<f32> for SignalScore {
    fn from(raw: f32) -> Self {
        SignalScore::from_legacy(raw)
    }
}

/// A pair that cleared the total threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub reference_id: i64,
    pub reference_size: u64,
    pub candidate_id: i64,
    pub candidate_size: u64,
    pub title_score: SignalScore,
    pub cover_score: SignalScore,
    pub artist_score: SignalScore,
    pub total_score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    LanguageMismatch,
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Duplicate(DuplicateEntry),
    Rejected(RejectReason),
    /// A cover has not been hashed yet; compare again after indexing.
    Deferred,
}

/// Settings a scan reads, resolved once from [`DuplicateConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    pub flags: SignalFlags,
    pub sensitivity: Sensitivity,
    pub thresholds: ThresholdRow,
    pub weights: ScoreWeights,
    /// Significant bits of the stored cover fingerprints.
    pub fingerprint_bits: u32,
}

impl ScoringContext {
    pub fn new(flags: SignalFlags, sensitivity: Sensitivity) -> Self {
        let config = DuplicateConfig {
            signals: flags,
            sensitivity,
            ..DuplicateConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &DuplicateConfig) -> Self {
        Self {
            flags: config.signals,
            sensitivity: config.sensitivity,
            thresholds: config.threshold_row(),
            weights: config.weights,
            fingerprint_bits: fingerprint_bits(config.hashing.bit_depth)
                .unwrap_or(DEFAULT_BIT_DEPTH * DEFAULT_BIT_DEPTH),
        }
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::from_config(&DuplicateConfig::default())
    }
}

pub fn score(
    reference: &DuplicateCandidate,
    candidate: &DuplicateCandidate,
    ctx: &ScoringContext,
    text: &dyn TextSimilarity,
) -> ScoreOutcome {
    let flags = &ctx.flags;

    if flags.use_language
        && !contains_same_language(&reference.country_codes, &candidate.country_codes)
    {
        return ScoreOutcome::Rejected(RejectReason::LanguageMismatch);
    }

    let cover_score = if flags.use_cover {
        match compute_cover_score(
            reference.cover_hash,
            candidate.cover_hash,
            ctx.thresholds.cover,
            ctx.fingerprint_bits,
        ) {
            Some(score) => score,
            None => {
                log::debug!(
                    "Deferring {} / {}: cover not hashed yet",
                    reference.id,
                    candidate.id
                );
                return ScoreOutcome::Deferred;
            }
        }
    } else {
        SignalScore::Excluded
    };

    let title_score = if flags.use_title {
        compute_title_score(reference, candidate, ctx, text)
    } else {
        SignalScore::Excluded
    };

    let artist_score = if flags.use_artist {
        compute_artist_score(&reference.artists, &candidate.artists)
    } else {
        SignalScore::Excluded
    };

    let total_score = total_score(title_score, cover_score, artist_score, &ctx.weights);
    if total_score < ctx.thresholds.total {
        return ScoreOutcome::Rejected(RejectReason::BelowThreshold);
    }

    ScoreOutcome::Duplicate(DuplicateEntry {
        reference_id: reference.id,
        reference_size: reference.size,
        candidate_id: candidate.id,
        candidate_size: candidate.size,
        title_score,
        cover_score,
        artist_score,
        total_score,
    })
}

/// [`score`], keeping only verdicts.
pub fn score_pair(
    reference: &DuplicateCandidate,
    candidate: &DuplicateCandidate,
    ctx: &ScoringContext,
    text: &dyn TextSimilarity,
) -> Option<DuplicateEntry> {
    match score(reference, candidate, ctx, text) {
        ScoreOutcome::Duplicate(entry) => Some(entry),
        _ => None,
    }
}

/// `None` when either cover still needs hashing.
pub fn compute_cover_score(
    reference: Fingerprint,
    candidate: Fingerprint,
    threshold: f32,
    bits: u32,
) -> Option<SignalScore> {
    if !reference.is_computed() || !candidate.is_computed() {
        return None;
    }

    let score = match reference.similarity(&candidate, bits) {
        None => SignalScore::Excluded,
        Some(similarity) if similarity < threshold => SignalScore::BelowThreshold,
        Some(similarity) => SignalScore::Value(similarity),
    };
    Some(score)
}

pub fn compute_title_score(
    reference: &DuplicateCandidate,
    candidate: &DuplicateCandidate,
    ctx: &ScoringContext,
    text: &dyn TextSimilarity,
) -> SignalScore {
    let (Some(ref_title), Some(cand_title)) = (reference.title_cleanup(), candidate.title_cleanup())
    else {
        return SignalScore::Excluded;
    };

    let threshold = ctx.thresholds.text;
    let sim_a = text.similarity(ref_title, cand_title);

    let chapters = match (&reference.chapters, &candidate.chapters) {
        (Some(a), Some(b)) if ctx.flags.ignore_chapters => Some((a, b)),
        _ => None,
    };

    let Some((ref_chapters, cand_chapters)) = chapters else {
        return if sim_a >= threshold {
            SignalScore::Value(sim_a as f32)
        } else {
            SignalScore::BelowThreshold
        };
    };

    if sim_a > NEAR_IDENTICAL_TITLE {
        return SignalScore::Value(sim_a as f32);
    }
    if sim_a < threshold {
        return SignalScore::BelowThreshold;
    }

    let sim_b = text.similarity(&ref_chapters.title_no_digits, &cand_chapters.title_no_digits);
    let needs_chapter_check = if sim_b > sim_a && sim_b > NEAR_IDENTICAL_TITLE {
        true
    } else {
        sim_b - sim_a >= CHAPTER_STRIP_GAIN
    };
    if !needs_chapter_check {
        return SignalScore::Value(sim_a as f32);
    }

    // Same title once chapter markers are gone: only overlapping chapters match
    if !ref_chapters.has_bounds() || !cand_chapters.has_bounds() {
        return SignalScore::Value(0.0);
    }
    if ref_chapters.overlaps(cand_chapters) {
        SignalScore::Value(sim_a as f32)
    } else {
        SignalScore::Value(0.0)
    }
}

pub fn compute_artist_score(reference: &[String], candidate: &[String]) -> SignalScore {
    if reference.is_empty() || candidate.is_empty() {
        return SignalScore::Excluded;
    }

    let matched = candidate.iter().any(|cand| {
        reference
            .iter()
            .any(|refr| cand == refr || is_transposition(cand, refr))
    });
    if matched {
        SignalScore::Value(1.0)
    } else {
        SignalScore::BelowThreshold
    }
}

/// Same characters in any order, whitespace ignored.
pub fn is_transposition(a: &str, b: &str) -> bool {
    let sorted = |s: &str| {
        let mut chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
        chars.sort_unstable();
        chars
    };
    let a = sorted(a);
    !a.is_empty() && a == sorted(b)
}

/// True unless both sides know their languages and share none.
pub fn contains_same_language(reference: &[String], candidate: &[String]) -> bool {
    if reference.is_empty() || candidate.is_empty() {
        return true;
    }
    reference.iter().any(|code| candidate.contains(code))
}

/// Weighted mean of the signals that were not excluded, 0 when none were.
pub fn total_score(
    title: SignalScore,
    cover: SignalScore,
    artist: SignalScore,
    weights: &ScoreWeights,
) -> f32 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (score, weight) in [
        (title, weights.title),
        (cover, weights.cover),
        (artist, weights.artist),
    ] {
        if let Some(value) = score.value() {
            weighted += value * weight;
            weight_sum += weight;
        }
    }

    if weight_sum > 0.0 {
        weighted / weight_sum
    } else {
        0.0
    }
}
