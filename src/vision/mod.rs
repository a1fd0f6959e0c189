//! Vision Layer
//!
//! Detects the geometric primitives that encode a chart's data and carries
//! the text blocks recognized by the external OCR collaborator:
//! - Bar rectangles (binarize + external contours)
//! - The traced polyline of a line chart
//! - Axis segments (probabilistic Hough)
//! - Pie circle and angular slices

pub mod axes;
pub mod bars;
pub mod line;
pub mod ocr;
pub mod pie;
pub mod preprocess;

use serde::{Deserialize, Serialize};

pub use axes::{detect_axes, AxisSegment, Axes};
pub use bars::{detect_bars, Bar};
pub use line::{trace_line, PolylinePoint};
pub use ocr::{OcrBackend, OcrEngine, SerializedOcr, SidecarOcr};
pub use pie::{segment_pie, slice_sizes, AngularSlice, Circle, PieSegmentation};

/// Text recognized by the external OCR collaborator
///
/// The serialized layout is the one the OCR stage writes:
/// `{"text": "...", "bbox": [[x, y], [x, y], [x, y], [x, y]], "conf": 0.9}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text content
    pub text: String,
    /// Four corner points of the text region
    #[serde(rename = "bbox")]
    pub quad: [[f64; 2]; 4],
    /// Recognition confidence (0.0 - 1.0)
    #[serde(rename = "conf", default)]
    pub confidence: f32,
}

impl TextBlock {
    /// Create a block from an axis-aligned box (x, y, width, height)
    pub fn from_rect(text: &str, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            text: text.to_string(),
            quad: [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
            confidence: 1.0,
        }
    }

    /// Mean of the four corners as (x, y)
    pub fn centroid(&self) -> (f64, f64) {
        let (sx, sy) = self
            .quad
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        (sx / 4.0, sy / 4.0)
    }

    /// Largest x coordinate of the quad
    pub fn max_x(&self) -> f64 {
        self.quad.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest y coordinate of the quad
    pub fn max_y(&self) -> f64 {
        self.quad.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max)
    }
}
