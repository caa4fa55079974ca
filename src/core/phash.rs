use crate::core::image::GrayscaleSample;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use thiserror::Error;

/// Side length of the grayscale square covers are sampled down to.
pub const COVER_WORK_RESOLUTION: u32 = 48;

/// Side length of the low-frequency DCT block kept in the fingerprint.
pub const DEFAULT_BIT_DEPTH: u32 = 8;

/// Largest block side whose bits still fit a `u64`.
pub const MAX_BIT_DEPTH: u32 = 8;

/// Legacy storage value for a cover that could not be decoded.
pub const UNDECODABLE_SENTINEL: i64 = i64::MIN;

/// Legacy storage value for a cover that has not been hashed yet.
pub const NOT_COMPUTED_SENTINEL: i64 = 0;

const FINGERPRINT_BITS: u32 = u64::BITS;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Sample is {actual}x{actual}, hasher expects {expected}x{expected}")]
    ResolutionMismatch { expected: u32, actual: u32 },

    #[error("Invalid hasher configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Perceptual fingerprint of a cover image.
///
/// Storage keeps the legacy integer encoding (`0` for "not hashed yet",
/// `i64::MIN` for "undecodable"); everything above the storage layer works
/// with this enum instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fingerprint {
    NotComputed,
    Undecodable,
    Value(u64),
}

impl Fingerprint {
    pub fn from_legacy(raw: i64) -> Self {
        match raw {
            NOT_COMPUTED_SENTINEL => Fingerprint::NotComputed,
            UNDECODABLE_SENTINEL => Fingerprint::Undecodable,
            other => Fingerprint::Value(other as u64),
        }
    }

    /// Encode for storage.
    ///
    /// The two real hashes whose bit patterns collide with a sentinel get
    /// their lowest bit set, which costs one bit of similarity at most.
    pub fn to_legacy(self) -> i64 {
        match self {
            Fingerprint::NotComputed => NOT_COMPUTED_SENTINEL,
            Fingerprint::Undecodable => UNDECODABLE_SENTINEL,
            Fingerprint::Value(bits) => {
                let raw = bits as i64;
                if raw == NOT_COMPUTED_SENTINEL || raw == UNDECODABLE_SENTINEL {
                    raw | 1
                } else {
                    raw
                }
            }
        }
    }

    pub fn is_computed(&self) -> bool {
        !matches!(self, Fingerprint::NotComputed)
    }

    /// Similarity against another fingerprint of `bits` significant bits,
    /// `None` unless both hold a real hash.
    pub fn similarity(&self, other: &Fingerprint, bits: u32) -> Option<f32> {
        match (self, other) {
            (Fingerprint::Value(a), Fingerprint::Value(b)) => Some(similarity_over(*a, *b, bits)),
            _ => None,
        }
    }
}

/// Number of fingerprint bits produced by a `bit_depth x bit_depth` block,
/// `None` when the depth is zero or the block does not fit a `u64`.
pub fn fingerprint_bits(bit_depth: u32) -> Option<u32> {
    if (1..=MAX_BIT_DEPTH).contains(&bit_depth) {
        Some(bit_depth * bit_depth)
    } else {
        None
    }
}

/// `1 - hamming(a, b) / 64`.
pub fn similarity(a: u64, b: u64) -> f32 {
    similarity_over(a, b, FINGERPRINT_BITS)
}

/// `1 - hamming(a, b) / bits`, looking at the low `bits` bits only.
pub fn similarity_over(a: u64, b: u64, bits: u32) -> f32 {
    let bits = bits.clamp(1, FINGERPRINT_BITS);
    let mask = if bits == FINGERPRINT_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    let distance = ((a ^ b) & mask).count_ones();
    1.0 - distance as f32 / bits as f32
}

/// DCT-based perceptual hasher.
///
/// Covers are sampled down to a 48x48 grayscale square and the top-left 8x8
/// block of its DCT becomes a 64-bit fingerprint. `image_hasher` resizes to
/// twice the hash size before its DCT, so a 48px sample with an 8x8 block
/// cannot be expressed with it.
///
/// `resolution` and `bit_depth` jointly define the fingerprint; two
/// fingerprints are only comparable when both came from the same settings.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    resolution: u32,
    bit_depth: u32,
    // cos((2x + 1) * u * PI / 2N), indexed [u][x]
    cosines: Vec<Vec<f64>>,
}

impl PerceptualHasher {
    pub fn new(resolution: u32, bit_depth: u32) -> Result<Self, HashError> {
        if fingerprint_bits(bit_depth).is_none() {
            return Err(HashError::InvalidConfiguration {
                message: format!("bit depth {} does not fit a 64-bit fingerprint", bit_depth),
            });
        }
        if resolution < bit_depth {
            return Err(HashError::InvalidConfiguration {
                message: format!(
                    "resolution {} is smaller than bit depth {}",
                    resolution, bit_depth
                ),
            });
        }

        Ok(Self {
            resolution,
            bit_depth,
            cosines: cosine_table(resolution, bit_depth),
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    /// Significant bits of the fingerprints this hasher produces.
    pub fn bits(&self) -> u32 {
        self.bit_depth * self.bit_depth
    }

    /// Compute the fingerprint of a grayscale sample.
    pub fn compute_fingerprint(&self, sample: &GrayscaleSample) -> Result<u64, HashError> {
        if sample.resolution() != self.resolution {
            return Err(HashError::ResolutionMismatch {
                expected: self.resolution,
                actual: sample.resolution(),
            });
        }

        let coefficients = self.low_frequency_dct(sample);

        // Mean of the block without the DC term, which dwarfs everything else
        let total: f64 = coefficients.iter().skip(1).sum();
        let mean = total / (coefficients.len() - 1).max(1) as f64;

        let hash = coefficients
            .iter()
            .fold(0u64, |acc, value| (acc << 1) | u64::from(*value > mean));
        Ok(hash)
    }

    /// Top-left `bit_depth x bit_depth` block of the 2-D DCT-II, row-major.
    fn low_frequency_dct(&self, sample: &GrayscaleSample) -> Vec<f64> {
        let n = self.resolution as usize;
        let depth = self.bit_depth as usize;
        let pixels = sample.pixels();

        // Transform along x first, keeping only the low frequencies
        let mut partial = vec![0.0f64; depth * n];
        for u in 0..depth {
            let row_cos = &self.cosines[u];
            for y in 0..n {
                let mut sum = 0.0;
                for x in 0..n {
                    sum += row_cos[x] * f64::from(pixels[y * n + x]);
                }
                partial[u * n + y] = sum;
            }
        }

        let scale = |k: usize| if k == 0 { FRAC_1_SQRT_2 } else { 1.0 };
        let mut block = Vec::with_capacity(depth * depth);
        for u in 0..depth {
            for v in 0..depth {
                let col_cos = &self.cosines[v];
                let mut sum = 0.0;
                for y in 0..n {
                    sum += col_cos[y] * partial[u * n + y];
                }
                block.push(scale(u) * scale(v) * sum);
            }
        }
        block
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self {
            resolution: COVER_WORK_RESOLUTION,
            bit_depth: DEFAULT_BIT_DEPTH,
            cosines: cosine_table(COVER_WORK_RESOLUTION, DEFAULT_BIT_DEPTH),
        }
    }
}

fn cosine_table(resolution: u32, bit_depth: u32) -> Vec<Vec<f64>> {
    let n = f64::from(resolution);
    (0..bit_depth)
        .map(|u| {
            (0..resolution)
                .map(|x| ((2.0 * f64::from(x) + 1.0) * f64::from(u) * PI / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
