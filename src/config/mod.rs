//! Application Configuration
//!
//! Detection thresholds and batch settings stored in TOML format.
//! Every pixel threshold used by the detectors lives here under a name,
//! with the historical value as its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bar detector settings
    pub bars: BarConfig,
    /// Line tracer settings
    pub line: LineConfig,
    /// Axis detector settings
    pub axes: AxisConfig,
    /// Pie segmenter settings
    pub pie: PieConfig,
    /// Tick-to-axis assignment settings
    pub calibration: CalibrationConfig,
    /// Output artifact settings
    pub output: OutputConfig,
    /// Performance settings
    pub performance: PerformanceConfig,
}

/// Bar detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Gaussian blur sigma applied before thresholding
    pub blur_sigma: f32,
    /// Pixels at or below this intensity become foreground
    pub threshold: u8,
    /// Bars must be strictly wider than this (pixels)
    pub min_width: u32,
    /// Bars must be strictly taller than this (pixels)
    pub min_height: u32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1, // roughly a 5x5 kernel
            threshold: 180,
            min_width: 15,
            min_height: 25,
        }
    }
}

/// Line tracing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Gaussian blur sigma applied before edge detection
    pub blur_sigma: f32,
    /// Canny low hysteresis threshold
    pub canny_low: f32,
    /// Canny high hysteresis threshold
    pub canny_high: f32,
    /// Dilation radius (L-infinity) used to bridge stroke gaps
    pub dilate_radius: u8,
    /// Douglas-Peucker tolerance in pixels
    pub simplify_epsilon: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 40.0,
            canny_high: 120.0,
            dilate_radius: 1,
            simplify_epsilon: 2.0,
        }
    }
}

/// Axis detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Canny low hysteresis threshold
    pub canny_low: f32,
    /// Canny high hysteresis threshold
    pub canny_high: f32,
    /// Minimum Hough votes for a line
    pub vote_threshold: u32,
    /// Hough non-maximum suppression radius
    pub suppression_radius: u32,
    /// Minimum segment length in pixels
    pub min_line_length: u32,
    /// Largest gap bridged inside one segment
    pub max_line_gap: u32,
    /// Endpoint tolerance for level / vertical classification
    pub angle_tolerance: f32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            vote_threshold: 100,
            suppression_radius: 2,
            min_line_length: 100,
            max_line_gap: 10,
            angle_tolerance: 10.0,
        }
    }
}

/// Pie segmentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PieConfig {
    /// Gaussian blur sigma applied before circle voting
    pub blur_sigma: f32,
    /// Smallest circle radius as a fraction of half the short image side
    pub min_radius_fraction: f32,
    /// Gradient magnitude threshold (fraction of max) for circle votes
    pub gradient_threshold: f32,
    /// Canny low hysteresis threshold for slice boundaries
    pub canny_low: f32,
    /// Canny high hysteresis threshold for slice boundaries
    pub canny_high: f32,
    /// Minimum Hough votes for a slice boundary
    pub vote_threshold: u32,
    /// Hough non-maximum suppression radius
    pub suppression_radius: u32,
    /// Maximum distance between a boundary line and the circle centre (pixels, lower bound)
    pub center_tolerance: f32,
    /// The same distance as a fraction of the radius; the larger of the two applies
    pub center_tolerance_fraction: f32,
    /// Fraction of sampled points on a half-line that must be edges
    pub min_ray_support: f32,
}

impl Default for PieConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            min_radius_fraction: 0.25,
            gradient_threshold: 0.2,
            canny_low: 80.0,
            canny_high: 150.0,
            vote_threshold: 120,
            suppression_radius: 8,
            center_tolerance: 6.0,
            center_tolerance_fraction: 0.03,
            min_ray_support: 0.5,
        }
    }
}

/// Tick-to-axis assignment for line charts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Margin in pixels: value-axis ticks sit left of it, category-axis ticks below it
    pub margin: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { margin: 100.0 }
    }
}

/// Output artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Suffix of the OCR sidecar file next to each picture
    pub ocr_suffix: String,
    /// Picture file extension scanned by the batch driver
    pub image_extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ocr_suffix: ".ocr.json".to_string(),
            image_extension: "png".to_string(),
        }
    }
}

/// Performance-related settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads for batch processing (None = available parallelism)
    pub workers: Option<usize>,
}

impl PerformanceConfig {
    /// Resolve the number of worker threads to use
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!((config.bars.blur_sigma - 1.1).abs() < 1e-6);
        assert_eq!(config.bars.threshold, 180);
        assert_eq!(config.bars.min_width, 15);
        assert_eq!(config.bars.min_height, 25);

        assert_eq!(config.line.canny_low, 40.0);
        assert_eq!(config.line.canny_high, 120.0);
        assert_eq!(config.line.simplify_epsilon, 2.0);

        assert_eq!(config.axes.vote_threshold, 100);
        assert_eq!(config.axes.min_line_length, 100);
        assert_eq!(config.axes.max_line_gap, 10);
        assert_eq!(config.axes.angle_tolerance, 10.0);

        assert_eq!(config.pie.vote_threshold, 120);
        assert_eq!(config.pie.center_tolerance, 6.0);
        assert!((config.pie.center_tolerance_fraction - 0.03).abs() < 1e-6);
        assert_eq!(config.calibration.margin, 100.0);
        assert_eq!(config.output.ocr_suffix, ".ocr.json");
        assert!(config.performance.workers.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.bars.threshold = 200;
        config.calibration.margin = 80.0;
        config.performance.workers = Some(3);

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.bars.threshold, 200);
        assert_eq!(parsed.calibration.margin, 80.0);
        assert_eq!(parsed.performance.workers, Some(3));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[bars]\nmin_width = 5\n").unwrap();

        assert_eq!(parsed.bars.min_width, 5);
        assert_eq!(parsed.bars.min_height, 25);
        assert_eq!(parsed.axes.max_line_gap, 10);
    }

    #[test]
    fn test_worker_count_ignores_zero() {
        let perf = PerformanceConfig { workers: Some(0) };
        assert!(perf.worker_count() >= 1);

        let perf = PerformanceConfig { workers: Some(4) };
        assert_eq!(perf.worker_count(), 4);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.bars.threshold, loaded.bars.threshold);
        assert_eq!(config.pie.suppression_radius, loaded.pie.suppression_radius);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
