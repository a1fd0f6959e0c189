//! Digitization Layer
//!
//! Turns detected primitives and OCR text into numbers:
//! - Tick extraction from recognized text
//! - Pixel-to-value calibration
//! - Per-chart-type value reconstruction

pub mod calibration;
pub mod reconstruct;
pub mod ticks;

pub use calibration::{fit, CalibrationError, CalibrationModel};
pub use reconstruct::{calibrate, reconstruct_bars, reconstruct_line, reconstruct_pie, BarValue, ChartSeries, LinePoint, PieSlice};
pub use ticks::{extract_category_labels, extract_numeric_ticks, parse_percentage, split_percentages, Axis, Tick};
