//! Bar detection
//!
//! Binarizes the chart, takes the external contours of the dark regions and
//! keeps their bounding rectangles when they are large enough to be bars.

use tracing::debug;

use super::preprocess::{blur, bounding_rect, external_contours, threshold_inverted};
use crate::config::BarConfig;
use crate::raster::RasterImage;

/// A detected bar in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    /// Left edge
    pub x: u32,
    /// Top edge, the value-bearing coordinate for upward bars
    pub y: u32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

/// Detect bars, sorted left to right
///
/// Rectangles not strictly larger than the configured minimum width and
/// height are dropped: borders, anti-aliasing residue and text fragments.
pub fn detect_bars(raster: &RasterImage, config: &BarConfig) -> Vec<Bar> {
    let blurred = blur(raster.gray(), config.blur_sigma);
    let binary = threshold_inverted(&blurred, config.threshold);

    let contours = external_contours(&binary);
    let mut bars: Vec<Bar> = contours
        .iter()
        .filter_map(|points| bounding_rect(points))
        .filter(|&(_, _, w, h)| w > config.min_width && h > config.min_height)
        .map(|(x, y, w, h)| Bar { x, y, w, h })
        .collect();

    bars.sort_by_key(|b| (b.x, b.y));

    debug!(
        "Bar detection: {} contours, {} bars kept",
        contours.len(),
        bars.len()
    );

    bars
}
