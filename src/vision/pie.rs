//! Pie chart segmentation
//!
//! Finds the bounding circle by gradient voting and the radial slice
//! boundaries with a Hough line transform, then turns the sorted boundary
//! angles into contiguous angular slices covering the full circle.
//!
//! Angles are measured like `atan2(dy, dx)` in image coordinates (y down),
//! in degrees within [0, 360).

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::debug;

use super::preprocess::{blur, edges_rgb};
use crate::config::PieConfig;
use crate::raster::RasterImage;

/// Boundary angles closer than this are merged (degrees)
const MERGE_TOLERANCE_DEG: f32 = 2.0;

/// Ray sampling starts this far out, as a fraction of the radius
const RAY_INNER_FRACTION: f32 = 0.2;

/// Ray sampling stops this far out, as a fraction of the radius
const RAY_OUTER_FRACTION: f32 = 0.9;

/// Half-width of the rim band for the first circle fit, as a fraction of the radius
const RIM_BAND_COARSE: f32 = 0.15;

/// Half-width of the rim band for later circle fits, as a fraction of the radius
const RIM_BAND_FINE: f32 = 0.02;

/// Least-squares passes over the rim band
const RIM_FIT_PASSES: usize = 3;

/// The pie's bounding circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

/// A contiguous angular interval of the pie
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSlice {
    /// Boundary the slice starts at
    pub start_angle: f32,
    /// Boundary the slice ends at (may be smaller than start on wraparound)
    pub end_angle: f32,
    /// Angular width in degrees
    pub size_degrees: f32,
}

/// Output of the pie segmenter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PieSegmentation {
    /// Detected bounding circle, if any
    pub circle: Option<Circle>,
    /// Slices in ascending boundary order
    pub slices: Vec<AngularSlice>,
}

/// Segment a pie chart into angular slices
pub fn segment_pie(raster: &RasterImage, config: &PieConfig) -> PieSegmentation {
    let blurred = blur(raster.gray(), config.blur_sigma);
    let circle = detect_circle(&blurred, config);

    // Neighbouring slices often differ in hue more than in brightness
    let edge_map = edges_rgb(raster.rgb(), config.canny_low, config.canny_high);
    let lines = detect_lines(
        &edge_map,
        LineDetectionOptions {
            vote_threshold: config.vote_threshold,
            suppression_radius: config.suppression_radius,
        },
    );

    let angles = match circle {
        Some(c) => boundary_rays(&edge_map, &lines, &c, config),
        // Without a centre the line angles themselves are the best we have
        None => lines.iter().map(|l| l.angle_in_degrees as f32).collect(),
    };
    let slices = slice_sizes(&angles);

    debug!(
        "Pie segmentation: circle={:?}, {} lines, {} boundaries, {} slices",
        circle,
        lines.len(),
        angles.len(),
        slices.len()
    );

    PieSegmentation { circle, slices }
}

/// Turn boundary angles into slices
///
/// Angles are sorted ascending; each slice spans to the next boundary and
/// the last one wraps around to the first, so the sizes sum to 360.
pub fn slice_sizes(angles: &[f32]) -> Vec<AngularSlice> {
    let mut sorted: Vec<f32> = angles.iter().map(|a| a.rem_euclid(360.0)).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    let mut slices: Vec<AngularSlice> = sorted
        .windows(2)
        .map(|w| AngularSlice {
            start_angle: w[0],
            end_angle: w[1],
            size_degrees: (w[1] - w[0]).rem_euclid(360.0),
        })
        .collect();

    let wrap = 360.0 - last + first;
    slices.push(AngularSlice {
        start_angle: last,
        end_angle: first,
        // A single boundary closes the whole circle
        size_degrees: if wrap >= 360.0 { 360.0 } else { wrap.rem_euclid(360.0) },
    });

    slices
}

/// Locate the dominant circle via gradient voting
///
/// Every strong-gradient pixel votes along both gradient directions for
/// all radii in range; the smoothed accumulator peak and the most common
/// edge distance from it give a coarse circle. Slice borders inside the
/// disk pull that estimate off centre, so it is then refined by
/// least-squares fits over the strong pixels in a narrowing band around
/// the rim.
pub fn detect_circle(gray: &GrayImage, config: &PieConfig) -> Option<Circle> {
    let (w, h) = gray.dimensions();
    if w < 8 || h < 8 {
        return None;
    }

    let r_max = (w.min(h) as f32 / 2.0).floor();
    let r_min = (r_max * config.min_radius_fraction).max(2.0);
    if r_max <= r_min {
        return None;
    }

    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);
    let gx_raw = gx.as_raw();
    let gy_raw = gy.as_raw();

    let max_mag = gx_raw
        .iter()
        .zip(gy_raw.iter())
        .map(|(&a, &b)| (a as f32).hypot(b as f32))
        .fold(0.0f32, f32::max);
    if max_mag < 1e-6 {
        return None;
    }
    let threshold = config.gradient_threshold * max_mag;

    let stride = w as usize;
    let mut accum = vec![0.0f32; stride * h as usize];
    let mut strong = Vec::new();

    for y in 0..h as usize {
        for x in 0..stride {
            let idx = y * stride + x;
            let (gxv, gyv) = (gx_raw[idx] as f32, gy_raw[idx] as f32);
            let mag = gxv.hypot(gyv);
            if mag < threshold {
                continue;
            }
            strong.push((x as f32, y as f32));

            let (dx, dy) = (gxv / mag, gyv / mag);
            let mut r = r_min;
            while r <= r_max {
                for sign in [1.0f32, -1.0] {
                    let vx = (x as f32 + sign * dx * r).round();
                    let vy = (y as f32 + sign * dy * r).round();
                    if vx >= 0.0 && vy >= 0.0 && vx < w as f32 && vy < h as f32 {
                        accum[vy as usize * stride + vx as usize] += 1.0;
                    }
                }
                r += 1.0;
            }
        }
    }

    let accum_img = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum)?;
    let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, 2.0);

    // First maximum in raster order
    let mut best = (0usize, 0.0f32);
    for (idx, &v) in smoothed.as_raw().iter().enumerate() {
        if v > best.1 {
            best = (idx, v);
        }
    }
    if best.1 <= 0.0 {
        return None;
    }
    let cx = (best.0 % stride) as f32;
    let cy = (best.0 / stride) as f32;

    // Radius: mode of strong-pixel distances within the voting range
    let bins = r_max as usize + 1;
    let mut histogram = vec![0u32; bins];
    for &(x, y) in &strong {
        let d = (x - cx).hypot(y - cy).round();
        if d >= r_min && d <= r_max {
            histogram[d as usize] += 1;
        }
    }
    let (radius, count) = histogram
        .iter()
        .enumerate()
        .fold((0usize, 0u32), |acc, (i, &c)| if c > acc.1 { (i, c) } else { acc });
    if count == 0 {
        return None;
    }

    let coarse = Circle {
        cx,
        cy,
        r: radius as f32,
    };
    Some(refine_circle(&strong, coarse))
}

/// Refit the circle to the strong pixels near its rim
fn refine_circle(strong: &[(f32, f32)], coarse: Circle) -> Circle {
    let mut circle = coarse;
    let mut band = (coarse.r * RIM_BAND_COARSE).max(4.0);

    for _ in 0..RIM_FIT_PASSES {
        let rim: Vec<(f32, f32)> = strong
            .iter()
            .copied()
            .filter(|&(x, y)| ((x - circle.cx).hypot(y - circle.cy) - circle.r).abs() <= band)
            .collect();
        match fit_circle(&rim) {
            Some(fitted) => circle = fitted,
            None => break,
        }
        band = (circle.r * RIM_BAND_FINE).max(3.0);
    }

    circle
}

/// Algebraic least-squares circle through a point set
///
/// Solved in coordinates centred on the point mean. None when the points
/// are too few or collinear.
fn fit_circle(points: &[(f32, f32)]) -> Option<Circle> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0 as f64).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1 as f64).sum::<f64>() / n;

    let (mut suu, mut svv, mut suv) = (0.0, 0.0, 0.0);
    let (mut suuu, mut svvv, mut suvv, mut svuu) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (u, v) = (x as f64 - mx, y as f64 - my);
        suu += u * u;
        svv += v * v;
        suv += u * v;
        suuu += u * u * u;
        svvv += v * v * v;
        suvv += u * v * v;
        svuu += v * u * u;
    }

    let det = suu * svv - suv * suv;
    if det.abs() < 1e-9 {
        return None;
    }
    let b1 = 0.5 * (suuu + suvv);
    let b2 = 0.5 * (svvv + svuu);
    let uc = (b1 * svv - b2 * suv) / det;
    let vc = (suu * b2 - suv * b1) / det;
    let r = (uc * uc + vc * vc + (suu + svv) / n).sqrt();

    if !(uc.is_finite() && vc.is_finite() && r.is_finite()) {
        return None;
    }
    Some(Circle {
        cx: (mx + uc) as f32,
        cy: (my + vc) as f32,
        r: r as f32,
    })
}

/// Resolve Hough lines through the centre into boundary ray angles
fn boundary_rays(edge_map: &GrayImage, lines: &[PolarLine], circle: &Circle, config: &PieConfig) -> Vec<f32> {
    let mut angles: Vec<f32> = Vec::new();
    let tolerance = config.center_tolerance.max(config.center_tolerance_fraction * circle.r);

    for line in lines {
        let theta = (line.angle_in_degrees as f32).to_radians();
        let (sin, cos) = theta.sin_cos();
        let offset = circle.cx * cos + circle.cy * sin - line.r;
        if offset.abs() > tolerance {
            continue;
        }

        // Sample from the centre's foot on the line, both ways along it
        let origin = (circle.cx - offset * cos, circle.cy - offset * sin);
        // The line direction is the normal turned by 90 degrees
        let along = (line.angle_in_degrees + 90) % 360;
        for angle in [along as f32, ((along + 180) % 360) as f32] {
            if ray_support(edge_map, origin, circle.r, angle) >= config.min_ray_support {
                angles.push(angle);
            }
        }
    }

    merge_close_angles(angles)
}

/// Fraction of sample points along a ray that hit an edge pixel
fn ray_support(edge_map: &GrayImage, origin: (f32, f32), radius: f32, angle_deg: f32) -> f32 {
    let (w, h) = edge_map.dimensions();
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let start = (radius * RAY_INNER_FRACTION).ceil() as i32;
    let end = (radius * RAY_OUTER_FRACTION).floor() as i32;
    if end <= start {
        return 0.0;
    }

    let mut hits = 0u32;
    let mut total = 0u32;
    for s in start..=end {
        let x = (origin.0 + cos * s as f32).round() as i64;
        let y = (origin.1 + sin * s as f32).round() as i64;
        total += 1;
        let near = (-1..=1).any(|oy| {
            (-1..=1).any(|ox| {
                let (sx, sy) = (x + ox, y + oy);
                sx >= 0
                    && sy >= 0
                    && sx < w as i64
                    && sy < h as i64
                    && edge_map.get_pixel(sx as u32, sy as u32)[0] > 0
            })
        });
        if near {
            hits += 1;
        }
    }

    hits as f32 / total as f32
}

/// Sort angles and fold near-duplicates (including across 0/360) into one
fn merge_close_angles(mut angles: Vec<f32>) -> Vec<f32> {
    angles.sort_by(|a, b| a.total_cmp(b));
    let mut merged: Vec<f32> = Vec::with_capacity(angles.len());
    for a in angles {
        match merged.last() {
            Some(&prev) if a - prev < MERGE_TOLERANCE_DEG => {}
            _ => merged.push(a),
        }
    }
    if merged.len() > 1 {
        let (first, last) = (merged[0], merged[merged.len() - 1]);
        if first + 360.0 - last < MERGE_TOLERANCE_DEG {
            merged.pop();
        }
    }
    merged
}
