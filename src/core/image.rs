use image::{imageops::FilterType, DynamicImage, ImageReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Empty image data")]
    Empty,

    #[error("Invalid sample: expected {expected} pixels, got {actual}")]
    InvalidSample { expected: usize, actual: usize },
}

/// Square 8-bit grayscale sample of a cover, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleSample {
    resolution: u32,
    pixels: Vec<u8>,
}

impl GrayscaleSample {
    pub fn new(resolution: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = (resolution as usize) * (resolution as usize);
        if pixels.len() != expected {
            return Err(DecodeError::InvalidSample {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { resolution, pixels })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Turns raw cover bytes into a fixed-size grayscale sample.
pub trait ImageDecoder: Send + Sync {
    fn decode_grayscale_square(
        &self,
        bytes: &[u8],
        resolution: u32,
    ) -> Result<GrayscaleSample, DecodeError>;
}

/// Decoder backed by the `image` crate.
pub struct ImageCrateDecoder {
    filter: FilterType,
}

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    fn load_image(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;
        Ok(img)
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode_grayscale_square(
        &self,
        bytes: &[u8],
        resolution: u32,
    ) -> Result<GrayscaleSample, DecodeError> {
        let img = self.load_image(bytes)?;

        // Covers are compared as squares, aspect ratio is not kept
        let gray = img
            .resize_exact(resolution, resolution, self.filter)
            .to_luma8();

        GrayscaleSample::new(resolution, gray.into_raw())
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new()
    }
}
