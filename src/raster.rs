//! Decoded chart rasters

use image::{DynamicImage, GrayImage, RgbImage};
use std::path::Path;

use crate::error::{DigitizeError, Result};

/// A decoded chart image, immutable input to every detector
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Luminance view
    gray: GrayImage,
    /// Colour view
    rgb: RgbImage,
}

impl RasterImage {
    /// Load and decode an image file
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|source| DigitizeError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_dynamic(img))
    }

    /// Decode an in-memory encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|source| DigitizeError::Image {
            path: Default::default(),
            source,
        })?;
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already decoded image
    pub fn from_dynamic(img: DynamicImage) -> Self {
        Self {
            gray: img.to_luma8(),
            rgb: img.to_rgb8(),
        }
    }

    /// Build a raster from a grayscale buffer
    pub fn from_gray(gray: GrayImage) -> Self {
        Self::from_dynamic(DynamicImage::ImageLuma8(gray))
    }

    /// Grayscale view
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Colour view
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Get dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}
