//! chart-digitizer - Recover numeric data from rendered chart images
//!
//! Detects the geometric primitives of bar, line and pie charts, reads the
//! axis text produced by an external OCR stage, fits a pixel-to-value
//! calibration and writes the recovered values as CSV.

pub mod config;
pub mod digitize;
pub mod dispatch;
pub mod error;
pub mod raster;
pub mod storage;
pub mod vision;

pub use config::AppConfig;
pub use dispatch::{Artifact, ChartKind, Dispatcher, PictureClass};
pub use error::DigitizeError;
pub use raster::RasterImage;
pub use storage::ChartRecord;
