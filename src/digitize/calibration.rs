//! Pixel-to-value calibration
//!
//! An ordinary least-squares affine fit over tick positions. A model only
//! exists when the fit is well posed, so callers never see a NaN slope.

use thiserror::Error;

use super::ticks::Tick;

/// Why a calibration could not be fitted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("need at least 2 ticks, found {found}")]
    TooFewTicks { found: usize },

    #[error("tick pixel positions do not span a range")]
    DegeneratePixels,

    #[error("non-finite tick or fit result")]
    NonFinite,
}

/// Affine map `value = slope * pixel + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    slope: f64,
    intercept: f64,
}

impl CalibrationModel {
    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Value at a pixel position
    pub fn value(&self, pixel: f64) -> f64 {
        self.slope * pixel + self.intercept
    }
}

/// Least-squares fit of ticks
pub fn fit(ticks: &[Tick]) -> Result<CalibrationModel, CalibrationError> {
    if ticks.len() < 2 {
        return Err(CalibrationError::TooFewTicks { found: ticks.len() });
    }
    if ticks
        .iter()
        .any(|t| !t.pixel_position.is_finite() || !t.value.is_finite())
    {
        return Err(CalibrationError::NonFinite);
    }

    let n = ticks.len() as f64;
    let mean_p = ticks.iter().map(|t| t.pixel_position).sum::<f64>() / n;
    let mean_v = ticks.iter().map(|t| t.value).sum::<f64>() / n;

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for t in ticks {
        let dp = t.pixel_position - mean_p;
        sxx += dp * dp;
        sxy += dp * (t.value - mean_v);
    }

    // Exact zero covers repeated positions; the relative check covers rounding noise
    if sxx <= f64::EPSILON * mean_p.abs().max(1.0) {
        return Err(CalibrationError::DegeneratePixels);
    }

    let slope = sxy / sxx;
    let intercept = mean_v - slope * mean_p;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CalibrationError::NonFinite);
    }

    Ok(CalibrationModel { slope, intercept })
}
