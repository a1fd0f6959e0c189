//! Image preprocessing shared by the detectors
//!
//! Thin wrappers over `imageproc` filters plus the contour helpers the bar
//! detector and line tracer both need.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::point::Point;

/// Gaussian blur; a non-positive sigma returns the input unchanged
pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return gray.clone();
    }
    imageproc::filter::gaussian_blur_f32(gray, sigma)
}

/// Inverse binary threshold: pixels at or below `cutoff` become 255, others 0
pub fn threshold_inverted(gray: &GrayImage, cutoff: u8) -> GrayImage {
    imageproc::map::map_colors(gray, |p: Luma<u8>| {
        if p[0] > cutoff {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

/// Canny edge map (255 = edge)
pub fn edges(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low, high)
}

/// Canny edges of each colour channel, combined
///
/// Catches borders between regions of similar luma but different hue,
/// which vanish in the grayscale view.
pub fn edges_rgb(rgb: &RgbImage, low: f32, high: f32) -> GrayImage {
    let channels = [
        imageproc::map::red_channel(rgb),
        imageproc::map::green_channel(rgb),
        imageproc::map::blue_channel(rgb),
    ];
    let mut combined = GrayImage::new(rgb.width(), rgb.height());
    for channel in &channels {
        let channel_edges = edges(channel, low, high);
        for (out, p) in combined.pixels_mut().zip(channel_edges.pixels()) {
            out[0] = out[0].max(p[0]);
        }
    }
    combined
}

/// Morphological dilation with a square (L-infinity) structuring element
pub fn dilate(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    imageproc::morphology::dilate(binary, Norm::LInf, radius)
}

/// Outer borders of the outermost foreground regions, in discovery order
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .filter(|points| !points.is_empty())
        .collect()
}

/// Axis-aligned bounding rectangle (x, y, width, height), inclusive of both edges
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(u32, u32, u32, u32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some((
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Enclosed area of a closed contour (shoelace)
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_threshold_inverted() {
        let gray = GrayImage::from_raw(3, 1, vec![0, 180, 181]).unwrap();
        let binary = threshold_inverted(&gray, 180);

        assert_eq!(binary.get_pixel(0, 0)[0], 255);
        assert_eq!(binary.get_pixel(1, 0)[0], 255);
        assert_eq!(binary.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_blur_zero_sigma_is_identity() {
        let gray = GrayImage::from_raw(2, 2, vec![0, 50, 100, 150]).unwrap();
        assert_eq!(blur(&gray, 0.0), gray);
    }

    #[test]
    fn test_external_contours_skip_holes_and_children() {
        let mut img = GrayImage::new(60, 60);
        // Ring with a filled square inside the hole
        draw_filled_rect_mut(&mut img, Rect::at(5, 5).of_size(50, 50), Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(15, 15).of_size(30, 30), Luma([0]));
        draw_filled_rect_mut(&mut img, Rect::at(25, 25).of_size(10, 10), Luma([255]));

        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounding_rect(&contours[0]), Some((5, 5, 50, 50)));
    }

    #[test]
    fn test_edges_rgb_sees_isoluminant_border() {
        // Red and green halves with the same luma
        let mut rgb = RgbImage::from_pixel(40, 40, Rgb([202, 0, 0]));
        for y in 0..40 {
            for x in 20..40 {
                rgb.put_pixel(x, y, Rgb([0, 60, 0]));
            }
        }
        let gray = image::DynamicImage::ImageRgb8(rgb.clone()).to_luma8();

        let count = |img: &GrayImage| img.pixels().filter(|p| p[0] > 0).count();
        assert_eq!(count(&edges(&gray, 80.0, 150.0)), 0);
        assert!(count(&edges_rgb(&rgb, 80.0, 150.0)) >= 30);
    }

    #[test]
    fn test_bounding_rect_empty() {
        assert_eq!(bounding_rect(&[]), None);
    }

    #[test]
    fn test_contour_area_square() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert!((contour_area(&square) - 100.0).abs() < 1e-9);
    }
}
