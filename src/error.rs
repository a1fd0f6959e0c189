//! Error taxonomy for the digitization pipeline
//!
//! Only failures of a single image are modelled here. Nothing in this crate
//! treats an error as fatal to a whole batch.

use std::path::PathBuf;
use thiserror::Error;

use crate::digitize::calibration::CalibrationError;
use crate::dispatch::ChartKind;

/// Failure of one image's pipeline
#[derive(Debug, Error)]
pub enum DigitizeError {
    /// The detector found no primitives
    #[error("no {kind} primitives detected")]
    DetectionEmpty { kind: ChartKind },

    /// An axis could not be calibrated
    #[error("calibration unavailable: {0}")]
    CalibrationUnavailable(#[from] CalibrationError),

    /// The image could not be read or decoded
    #[error("failed to load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The OCR collaborator failed
    #[error("OCR failed for {path:?}: {message}")]
    Ocr { path: PathBuf, message: String },

    /// Writing the output artifact failed
    #[error("failed to write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DigitizeError {
    /// Whether this failure degrades output without indicating a broken input
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::DetectionEmpty { .. } | Self::CalibrationUnavailable(_)
        )
    }
}

/// Result alias used across the pipeline
pub type Result<T> = std::result::Result<T, DigitizeError>;
