//! Value reconstruction
//!
//! Projects detected primitives through the fitted calibrations. A missing
//! calibration never aborts reconstruction: the affected values become NaN
//! and the unaffected axis is still reported.

use tracing::debug;

use super::calibration::{fit, CalibrationModel};
use super::ticks::{extract_category_labels, extract_numeric_ticks, parse_percentage, split_percentages, Axis, Tick};
use crate::error::Result;
use crate::vision::{Axes, Bar, PieSegmentation, PolylinePoint, TextBlock};

/// One bar's recovered value
#[derive(Debug, Clone, PartialEq)]
pub struct BarValue {
    /// Category label paired by position, if the chart has any
    pub label: Option<String>,
    pub value: f64,
}

/// One recovered line chart sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub x: f64,
    pub y: f64,
}

/// One pie slice's label and share
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    /// Share of the whole in percent
    pub percentage: f64,
}

/// Recovered data of a chart
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSeries {
    Bar(Vec<BarValue>),
    Line(Vec<LinePoint>),
    Pie(Vec<PieSlice>),
}

impl ChartSeries {
    /// Number of recovered data points
    pub fn len(&self) -> usize {
        match self {
            Self::Bar(v) => v.len(),
            Self::Line(v) => v.len(),
            Self::Pie(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fit a model or log why there is none
fn fit_or_log(ticks: &[Tick], what: &str) -> Option<CalibrationModel> {
    match calibrate(ticks) {
        Ok(model) => Some(model),
        Err(e) => {
            debug!("No {} calibration: {}", what, e);
            None
        }
    }
}

/// Fit an axis calibration, reporting failure in pipeline terms
pub fn calibrate(ticks: &[Tick]) -> Result<CalibrationModel> {
    Ok(fit(ticks)?)
}

/// Bar values from the top edge of each bar
///
/// Every numeric block is a value-axis tick positioned at its y centroid.
pub fn reconstruct_bars(bars: &[Bar], blocks: &[TextBlock]) -> Vec<BarValue> {
    let ticks = extract_numeric_ticks(blocks, Axis::Y);
    let model = fit_or_log(&ticks, "value axis");
    let labels = extract_category_labels(blocks);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| BarValue {
            label: labels.get(i).map(|b| b.text.trim().to_string()),
            value: model.map_or(f64::NAN, |m| m.value(bar.y as f64)),
        })
        .collect()
}

/// Sort ticks along the axis before fitting
fn sorted(mut ticks: Vec<Tick>) -> Vec<Tick> {
    ticks.sort_by(|a, b| a.pixel_position.total_cmp(&b.pixel_position));
    ticks
}

/// Line samples with independent calibration of each axis
///
/// Blocks ending left of `margin` label the value axis (y); blocks reaching
/// below `margin` label the category axis (x). A block can be in both. An
/// axis is only calibrated when its axis line was detected.
pub fn reconstruct_line(polyline: &[PolylinePoint], axes: &Axes, blocks: &[TextBlock], margin: f64) -> Vec<LinePoint> {
    let value_blocks = blocks.iter().filter(|b| b.max_x() < margin);
    let category_blocks = blocks.iter().filter(|b| b.max_y() > margin);

    let y_model = axes
        .y_axis
        .and_then(|_| fit_or_log(&sorted(extract_numeric_ticks(value_blocks, Axis::Y)), "y axis"));
    let x_model = axes
        .x_axis
        .and_then(|_| fit_or_log(&sorted(extract_numeric_ticks(category_blocks, Axis::X)), "x axis"));

    debug!(
        "Line calibration: x={}, y={}",
        x_model.is_some(),
        y_model.is_some()
    );

    polyline
        .iter()
        .map(|p| LinePoint {
            x: x_model.map_or(f64::NAN, |m| m.value(p.x as f64)),
            y: y_model.map_or(f64::NAN, |m| m.value(p.y as f64)),
        })
        .collect()
}

/// Label and share of each slice
///
/// Labels pair with slices in order until either runs out. A slice takes
/// the first percentage block mentioning its label, otherwise its angular
/// share rounded to one decimal.
pub fn reconstruct_pie(segmentation: &PieSegmentation, blocks: &[TextBlock]) -> Vec<PieSlice> {
    let (percentages, labels) = split_percentages(blocks);

    labels
        .iter()
        .zip(&segmentation.slices)
        .map(|(label_block, slice)| {
            let label = label_block.text.trim().to_string();
            let needle = label.to_lowercase();
            let stated = percentages
                .iter()
                .find(|p| p.text.to_lowercase().contains(&needle))
                .and_then(|p| parse_percentage(&p.text));

            let percentage = stated
                .unwrap_or_else(|| (slice.size_degrees as f64 / 360.0 * 1000.0).round() / 10.0);
            PieSlice { label, percentage }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BarConfig, PieConfig};
    use crate::digitize::CalibrationError;
    use crate::error::DigitizeError;
    use crate::raster::RasterImage;
    use crate::vision::{detect_bars, segment_pie, slice_sizes, AxisSegment};
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn block(text: &str, x: f64, y: f64) -> TextBlock {
        TextBlock::from_rect(text, x, y, 10.0, 10.0)
    }

    fn segment() -> AxisSegment {
        AxisSegment { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 }
    }

    #[test]
    fn test_bar_chart_end_to_end() {
        let mut img = GrayImage::from_pixel(300, 220, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(60, 160).of_size(40, 40), Luma([0]));
        draw_filled_rect_mut(&mut img, Rect::at(180, 40).of_size(40, 160), Luma([0]));
        let bars = detect_bars(&RasterImage::from_gray(img), &BarConfig::default());
        assert_eq!(bars.len(), 2);

        // "0" centred at y = 200, "100" centred at y = 0
        let blocks = vec![block("0", 5.0, 195.0), block("100", 5.0, -5.0)];
        let values = reconstruct_bars(&bars, &blocks);

        assert!((values[0].value - 20.0).abs() <= 1.5, "got {}", values[0].value);
        assert!((values[1].value - 80.0).abs() <= 1.5, "got {}", values[1].value);
    }

    #[test]
    fn test_bars_without_ticks_are_nan() {
        let bars = [Bar { x: 0, y: 10, w: 20, h: 30 }];
        let values = reconstruct_bars(&bars, &[block("7", 0.0, 0.0)]);

        assert_eq!(values.len(), 1);
        assert!(values[0].value.is_nan());
    }

    #[test]
    fn test_bar_labels_pair_by_position() {
        let bars = [
            Bar { x: 0, y: 100, w: 20, h: 30 },
            Bar { x: 50, y: 50, w: 20, h: 80 },
        ];
        let blocks = vec![block("0", 0.0, 195.0), block("100", 0.0, -5.0), block("North", 0.0, 210.0)];
        let values = reconstruct_bars(&bars, &blocks);

        assert_eq!(values[0].label.as_deref(), Some("North"));
        assert_eq!(values[1].label, None);
        assert!((values[1].value - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_dual_axis() {
        let axes = Axes { x_axis: Some(segment()), y_axis: Some(segment()) };
        let blocks = vec![
            // Value axis on the left, y centroids 85 and 15
            block("0", 20.0, 80.0),
            block("10", 20.0, 10.0),
            // Category axis along the bottom, x centroids 155 and 255
            block("2000", 150.0, 210.0),
            block("2010", 250.0, 210.0),
        ];
        let polyline = [PolylinePoint { x: 155, y: 85 }, PolylinePoint { x: 255, y: 15 }];

        let points = reconstruct_line(&polyline, &axes, &blocks, 100.0);
        assert!((points[0].x - 2000.0).abs() < 1e-9);
        assert!((points[0].y - 0.0).abs() < 1e-9);
        assert!((points[1].x - 2010.0).abs() < 1e-9);
        assert!((points[1].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_one_axis_failing_keeps_other() {
        let axes = Axes { x_axis: Some(segment()), y_axis: Some(segment()) };
        // Only one value tick: the y axis cannot be fitted
        let blocks = vec![block("5", 20.0, 40.0), block("1", 150.0, 210.0), block("2", 250.0, 210.0)];
        let polyline = [PolylinePoint { x: 205, y: 60 }];

        let points = reconstruct_line(&polyline, &axes, &blocks, 100.0);
        assert!((points[0].x - 1.5).abs() < 1e-9);
        assert!(points[0].y.is_nan());
    }

    #[test]
    fn test_line_missing_axis_line_is_nan() {
        let axes = Axes { x_axis: None, y_axis: Some(segment()) };
        let blocks = vec![
            block("0", 20.0, 190.0),
            block("10", 20.0, 90.0),
            block("1", 150.0, 210.0),
            block("2", 250.0, 210.0),
        ];
        let points = reconstruct_line(&[PolylinePoint { x: 155, y: 95 }], &axes, &blocks, 100.0);

        assert!(points[0].x.is_nan());
        assert!((points[0].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pie_stated_and_fallback_percentages() {
        let segmentation = PieSegmentation {
            circle: None,
            slices: slice_sizes(&[0.0, 90.0, 200.0]),
        };
        let blocks = vec![
            block("Rent", 0.0, 0.0),
            block("rent 40%", 0.0, 0.0),
            block("Food", 0.0, 0.0),
        ];

        let slices = reconstruct_pie(&segmentation, &blocks);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0], PieSlice { label: "Rent".to_string(), percentage: 40.0 });
        // 110 degrees of 360
        assert_eq!(slices[1].label, "Food");
        assert!((slices[1].percentage - 30.6).abs() < 1e-9);
    }

    #[test]
    fn test_pie_shorter_side_wins() {
        let segmentation = PieSegmentation {
            circle: None,
            slices: slice_sizes(&[45.0]),
        };
        let blocks = vec![block("A", 0.0, 0.0), block("B", 0.0, 0.0)];

        let slices = reconstruct_pie(&segmentation, &blocks);
        assert_eq!(slices, vec![PieSlice { label: "A".to_string(), percentage: 100.0 }]);
    }

    #[test]
    fn test_calibrate_reports_unavailable() {
        let err = calibrate(&[Tick { pixel_position: 10.0, value: 1.0 }]).unwrap_err();

        assert!(matches!(
            err,
            DigitizeError::CalibrationUnavailable(CalibrationError::TooFewTicks { found: 1 })
        ));
        assert!(err.is_benign());
    }

    #[test]
    fn test_pie_from_segmented_image() {
        // Sectors start at 30, 135 and 250 degrees on a 600 px canvas
        let shade = |angle: f32| match angle {
            a if (30.0..135.0).contains(&a) => 20u8,
            a if (135.0..250.0).contains(&a) => 110,
            _ => 200,
        };
        let img = GrayImage::from_fn(600, 600, |x, y| {
            let (dx, dy) = (x as f32 - 300.0, y as f32 - 300.0);
            if dx.hypot(dy) > 280.0 {
                Luma([255])
            } else {
                Luma([shade(dy.atan2(dx).to_degrees().rem_euclid(360.0))])
            }
        });
        let segmentation = segment_pie(&RasterImage::from_gray(img), &PieConfig::default());
        let blocks = vec![block("A", 0.0, 0.0), block("B", 0.0, 0.0), block("C", 0.0, 0.0)];

        let slices = reconstruct_pie(&segmentation, &blocks);
        assert_eq!(slices.len(), 3, "segmentation: {:?}", segmentation);
        for (slice, want) in slices.iter().zip([29.2, 31.9, 38.9]) {
            assert!((slice.percentage - want).abs() <= 1.0, "{:?} expected {}", slice, want);
        }
    }
}
