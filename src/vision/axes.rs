//! Axis detection for line charts
//!
//! Hough lines are detected on the Canny edge map and then walked pixel by
//! pixel to recover finite segments (runs of edge pixels, small gaps
//! bridged). Level segments are x-axis candidates, upright ones y-axis
//! candidates. For each axis the last candidate in scan order is kept.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::debug;

use super::preprocess::edges;
use crate::config::AxisConfig;
use crate::raster::RasterImage;

/// A finite line segment in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl AxisSegment {
    /// Euclidean length
    pub fn length(&self) -> f32 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }
}

/// Detected chart axes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axes {
    pub x_axis: Option<AxisSegment>,
    pub y_axis: Option<AxisSegment>,
}

/// Detect the x and y axis segments of a chart
pub fn detect_axes(raster: &RasterImage, config: &AxisConfig) -> Axes {
    let edge_map = edges(raster.gray(), config.canny_low, config.canny_high);
    let segments = detect_segments(&edge_map, config);
    let axes = classify_segments(&segments, config.angle_tolerance);

    debug!(
        "Axis detection: {} segments, x_axis={:?}, y_axis={:?}",
        segments.len(),
        axes.x_axis,
        axes.y_axis
    );

    axes
}

/// Assign segments to axes; a later candidate replaces an earlier one
pub fn classify_segments(segments: &[AxisSegment], tolerance: f32) -> Axes {
    let mut axes = Axes::default();
    for seg in segments {
        if (seg.y2 - seg.y1).abs() < tolerance {
            axes.x_axis = Some(*seg);
        }
        if (seg.x2 - seg.x1).abs() < tolerance {
            axes.y_axis = Some(*seg);
        }
    }
    axes
}

/// Probabilistic-style segment extraction over a binary edge map
///
/// Order: Hough line order, then position along each line.
pub fn detect_segments(edge_map: &GrayImage, config: &AxisConfig) -> Vec<AxisSegment> {
    let options = LineDetectionOptions {
        vote_threshold: config.vote_threshold,
        suppression_radius: config.suppression_radius,
    };
    let lines = detect_lines(edge_map, options);

    lines
        .iter()
        .flat_map(|line| walk_line(edge_map, line, config.min_line_length, config.max_line_gap))
        .collect()
}

/// Collect runs of edge pixels along one polar line
fn walk_line(edge_map: &GrayImage, line: &PolarLine, min_length: u32, max_gap: u32) -> Vec<AxisSegment> {
    let (w, h) = edge_map.dimensions();
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin, cos) = theta.sin_cos();

    // Foot of the normal and unit direction along the line
    let (px, py) = (line.r * cos, line.r * sin);
    let (dx, dy) = (-sin, cos);

    let reach = (w as f32).hypot(h as f32).ceil() as i32;
    let mut segments = Vec::new();
    let mut run: Option<(i32, i32)> = None;

    let close = |run: (i32, i32), segments: &mut Vec<AxisSegment>| {
        let (start, end) = run;
        let seg = AxisSegment {
            x1: (px + dx * start as f32).round(),
            y1: (py + dy * start as f32).round(),
            x2: (px + dx * end as f32).round(),
            y2: (py + dy * end as f32).round(),
        };
        if seg.length() >= min_length as f32 {
            segments.push(seg);
        }
    };

    for t in -reach..=reach {
        let x = (px + dx * t as f32).round() as i64;
        let y = (py + dy * t as f32).round() as i64;
        let hit = is_edge_near(edge_map, x, y, (dx, dy));

        match (hit, run) {
            (true, None) => run = Some((t, t)),
            (true, Some((start, _))) => run = Some((start, t)),
            (false, Some((start, end))) if (t - end) as u32 > max_gap => {
                close((start, end), &mut segments);
                run = None;
            }
            _ => {}
        }
    }
    if let Some(r) = run {
        close(r, &mut segments);
    }

    segments
}

/// Edge test at a pixel or its neighbours across the line direction
fn is_edge_near(edge_map: &GrayImage, x: i64, y: i64, (dx, dy): (f32, f32)) -> bool {
    let (w, h) = edge_map.dimensions();
    // Step across the line, along the normal
    let (nx, ny) = (dy.round() as i64, -dx.round() as i64);
    [(0, 0), (nx, ny), (-nx, -ny)].iter().any(|&(ox, oy)| {
        let (sx, sy) = (x + ox, y + oy);
        sx >= 0 && sy >= 0 && sx < w as i64 && sy < h as i64 && edge_map.get_pixel(sx as u32, sy as u32)[0] > 0
    })
}
