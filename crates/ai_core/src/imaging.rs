//! Leaf image preprocessing for the disease recommender
//!
//! Decoded images are converted to RGB, resized to a fixed square and
//! flattened row-major (`[y][x][channel]`) with each channel scaled to
//! `[0, 1]`. Simple statistics about the original photo are reported
//! alongside the prediction.

use crate::errors::ValidationError;
use crate::features::FeatureVector;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageReader, Limits, RgbImage};
use serde::Serialize;
use std::io::Cursor;

/// Side length the disease model was trained on
pub const IMAGE_SIZE: u32 = 128;

/// Sobel magnitude (0-255 luminance scale) counted as an edge
const EDGE_THRESHOLD: f64 = 100.0;

/// Default cap on image side length, checked before pixels are decoded
pub const MAX_DIMENSION: u32 = 8192;

/// Statistics describing the submitted image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    /// Mean luminance, 0-255
    pub brightness: f64,
    /// Luminance standard deviation
    pub contrast: f64,
    /// Fraction of pixels on an edge
    pub edge_density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    size: u32,
    max_dimension: u32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(IMAGE_SIZE)
    }
}

impl ImagePreprocessor {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            max_dimension: MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Length of the flattened feature vector
    pub fn n_features(&self) -> usize {
        (self.size as usize) * (self.size as usize) * 3
    }

    /// Decode raw bytes and produce model features plus image statistics
    pub fn preprocess(&self, bytes: &[u8]) -> Result<(FeatureVector, ImageStats), ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::InvalidImage("empty image payload".to_string()));
        }
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        reader.limits(limits);

        let decoded = reader.decode().map_err(|e| ValidationError::InvalidImage(e.to_string()))?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ValidationError::InvalidImage("image has no pixels".to_string()));
        }

        let rgb = decoded.to_rgb8();
        let stats = image_stats(&decoded.to_luma8());
        Ok((self.features_from_rgb(&rgb), stats))
    }

    /// Resize and flatten an already decoded image
    pub fn features_from_rgb(&self, rgb: &RgbImage) -> FeatureVector {
        let resized = imageops::resize(rgb, self.size, self.size, FilterType::CatmullRom);
        let values = resized
            .pixels()
            .flat_map(|p| p.0)
            .map(|c| f64::from(c) / 255.0)
            .collect();
        FeatureVector::new(values)
    }
}

fn image_stats(gray: &GrayImage) -> ImageStats {
    let (width, height) = gray.dimensions();
    let n = f64::from(width) * f64::from(height);

    let sum: f64 = gray.pixels().map(|p| f64::from(p.0[0])).sum();
    let brightness = sum / n;
    let variance = gray
        .pixels()
        .map(|p| (f64::from(p.0[0]) - brightness).powi(2))
        .sum::<f64>()
        / n;

    ImageStats {
        width,
        height,
        brightness,
        contrast: variance.sqrt(),
        edge_density: edge_density(gray),
    }
}

/// Fraction of interior pixels whose Sobel gradient exceeds the threshold
fn edge_density(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);
    let mut edges = 0usize;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x - 1, y)
                - px(x - 1, y + 1);
            let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x, y - 1)
                - px(x + 1, y - 1);
            if (gx * gx + gy * gy).sqrt() > EDGE_THRESHOLD {
                edges += 1;
            }
        }
    }
    edges as f64 / (f64::from(width - 2) * f64::from(height - 2))
}
