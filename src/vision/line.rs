//! Line chart tracing
//!
//! The plotted series is taken to be the silhouette with the largest
//! enclosed area in the dilated edge map. Its outer contour is simplified
//! with Douglas-Peucker and returned in traversal order.

use imageproc::geometry::approximate_polygon_dp;
use tracing::debug;

use super::preprocess::{blur, contour_area, dilate, edges, external_contours};
use crate::config::LineConfig;
use crate::raster::RasterImage;

/// A point of the traced polyline in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolylinePoint {
    pub x: i32,
    pub y: i32,
}

/// Trace the plotted line
///
/// Points follow contour traversal order; x is not guaranteed to be
/// monotonic. Returns an empty polyline when nothing is found.
pub fn trace_line(raster: &RasterImage, config: &LineConfig) -> Vec<PolylinePoint> {
    let blurred = blur(raster.gray(), config.blur_sigma);
    let edge_map = edges(&blurred, config.canny_low, config.canny_high);
    let bridged = dilate(&edge_map, config.dilate_radius);

    let contours = external_contours(&bridged);

    // Largest area wins, first one on ties
    let mut best: Option<(f64, &Vec<_>)> = None;
    for contour in &contours {
        let area = contour_area(contour);
        if best.map_or(true, |(best_area, _)| area > best_area) {
            best = Some((area, contour));
        }
    }

    let Some((area, contour)) = best else {
        debug!("Line tracing: no contours found");
        return Vec::new();
    };

    let simplified = approximate_polygon_dp(contour, config.simplify_epsilon, false);

    debug!(
        "Line tracing: {} contours, largest area {:.1}, {} -> {} points",
        contours.len(),
        area,
        contour.len(),
        simplified.len()
    );

    simplified
        .into_iter()
        .map(|p| PolylinePoint { x: p.x, y: p.y })
        .collect()
}
