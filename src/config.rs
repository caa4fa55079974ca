use crate::core::phash::{fingerprint_bits, COVER_WORK_RESOLUTION, DEFAULT_BIT_DEPTH};
use crate::core::text::TextComparator;
use crate::core::title::{ChapterRules, MAX_CHAPTER_GAP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// Threshold tables indexed by sensitivity, calibrated for 48px covers
pub const COVER_THRESHOLDS: [f32; 3] = [0.8, 0.85, 0.9];
pub const TEXT_THRESHOLDS: [f64; 3] = [0.78, 0.8, 0.85];
pub const TOTAL_THRESHOLDS: [f32; 3] = [0.8, 0.85, 0.9];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Which comparison signals take part in a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalFlags {
    pub use_title: bool,
    pub use_cover: bool,
    pub use_artist: bool,
    pub use_language: bool,
    pub ignore_chapters: bool,
}

impl Default for SignalFlags {
    fn default() -> Self {
        Self {
            use_title: true,
            use_cover: true,
            use_artist: true,
            use_language: true,
            ignore_chapters: true,
        }
    }
}

/// Row selector for the threshold tables; higher is stricter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    pub fn index(self) -> usize {
        match self {
            Sensitivity::Low => 0,
            Sensitivity::Medium => 1,
            Sensitivity::High => 2,
        }
    }
}

impl TryFrom<u8> for Sensitivity {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Sensitivity::Low),
            1 => Ok(Sensitivity::Medium),
            2 => Ok(Sensitivity::High),
            other => Err(ConfigError::Invalid {
                message: format!("sensitivity must be 0, 1 or 2, got {}", other),
            }),
        }
    }
}

impl From<Sensitivity> for u8 {
    fn from(sensitivity: Sensitivity) -> Self {
        sensitivity.index() as u8
    }
}

/// One row of the threshold tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRow {
    pub cover: f32,
    pub text: f64,
    pub total: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cover: [f32; 3],
    pub text: [f64; 3],
    pub total: [f32; 3],
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cover: COVER_THRESHOLDS,
            text: TEXT_THRESHOLDS,
            total: TOTAL_THRESHOLDS,
        }
    }
}

impl Thresholds {
    pub fn row(&self, sensitivity: Sensitivity) -> ThresholdRow {
        let i = sensitivity.index();
        ThresholdRow {
            cover: self.cover[i],
            text: self.text[i],
            total: self.total[i],
        }
    }
}

/// Per-signal weights of the total score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub title: f32,
    pub cover: f32,
    pub artist: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title: 1.0,
            cover: 1.0,
            artist: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashSettings {
    pub resolution: u32,
    pub bit_depth: u32,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            resolution: COVER_WORK_RESOLUTION,
            bit_depth: DEFAULT_BIT_DEPTH,
        }
    }
}

/// Everything a duplicate scan reads, loaded once before the scan starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub signals: SignalFlags,
    pub sensitivity: Sensitivity,
    pub thresholds: Thresholds,
    pub weights: ScoreWeights,
    pub hashing: HashSettings,
    pub chapters: ChapterRules,
    pub text_comparator: TextComparator,
    pub write_sidecar: bool,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            signals: SignalFlags::default(),
            sensitivity: Sensitivity::default(),
            thresholds: Thresholds::default(),
            weights: ScoreWeights::default(),
            hashing: HashSettings::default(),
            chapters: ChapterRules::default(),
            text_comparator: TextComparator::default(),
            write_sidecar: true,
        }
    }
}

impl DuplicateConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: DuplicateConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        let tables_ok = self.thresholds.cover.iter().all(|v| in_unit(f64::from(*v)))
            && self.thresholds.text.iter().all(|v| in_unit(*v))
            && self.thresholds.total.iter().all(|v| in_unit(f64::from(*v)));
        if !tables_ok {
            return Err(ConfigError::Invalid {
                message: "thresholds must lie within [0, 1]".to_string(),
            });
        }

        let weights = [self.weights.title, self.weights.cover, self.weights.artist];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid {
                message: "score weights must be finite and non-negative".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.chapters.tail_ratio) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "chapter tail ratio must lie within [0, 1], got {}",
                    self.chapters.tail_ratio
                ),
            });
        }

        if self.chapters.max_gap > MAX_CHAPTER_GAP {
            return Err(ConfigError::Invalid {
                message: format!(
                    "chapter gap must be at most {}, got {}",
                    MAX_CHAPTER_GAP, self.chapters.max_gap
                ),
            });
        }

        if fingerprint_bits(self.hashing.bit_depth).is_none()
            || self.hashing.resolution < self.hashing.bit_depth
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "unsupported hash settings {}px / {} bits",
                    self.hashing.resolution, self.hashing.bit_depth
                ),
            });
        }

        Ok(())
    }

    pub fn threshold_row(&self) -> ThresholdRow {
        self.thresholds.row(self.sensitivity)
    }
}
