//! Chart dispatch and batch processing
//!
//! Selects the pipeline for a chart label, isolates every image's failure
//! and guarantees an output artifact for each processed picture. Batches
//! run on a small worker pool fed through a channel; the OCR engine is the
//! only state shared between workers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::unbounded;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::digitize::{reconstruct_bars, reconstruct_line, reconstruct_pie, ChartSeries};
use crate::error::{DigitizeError, Result};
use crate::raster::RasterImage;
use crate::storage::{self, write_placeholder, ChartRecord};
use crate::vision::{detect_axes, detect_bars, segment_pie, trace_line, OcrEngine, TextBlock};

/// Picture classes that never carry chart data
pub const REDUNDANT_CLASSES: &[&str] = &[
    "remote_sensing",
    "logo",
    "other",
    "map",
    "screenshot",
    "signature",
    "chemistry_molecular_structure",
    "icon",
    "stamp",
    "chemistry_markush_structure",
    "bar_code",
    "qr_code",
];

/// Supported chart types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    /// Chart type named by a picture label
    ///
    /// Matching is by substring, so `stacked_bar_chart` selects the bar
    /// pipeline.
    pub fn from_label(label: &str) -> Option<Self> {
        if label.contains("bar_chart") {
            Some(Self::Bar)
        } else if label.contains("line_chart") {
            Some(Self::Line)
        } else if label.contains("pie_chart") {
            Some(Self::Pie)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the batch driver does with a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureClass {
    /// Digitize with the given pipeline
    Chart(ChartKind),
    /// Skip without an artifact
    Redundant,
    /// No pipeline; leave an empty artifact
    Unsupported,
}

impl PictureClass {
    pub fn from_label(label: &str) -> Self {
        if REDUNDANT_CLASSES.contains(&label) {
            Self::Redundant
        } else {
            ChartKind::from_label(label).map_or(Self::Unsupported, Self::Chart)
        }
    }
}

/// Label carried by a picture file name: `<doc>-picture-<n>-<label>.<ext>`
pub fn label_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, label) = stem.rsplit_once('-')?;
    Some(label.to_string())
}

/// A processed picture and its CSV artifact
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub csv: PathBuf,
    pub image: PathBuf,
    /// Pipeline used, None for unsupported labels
    pub kind: Option<ChartKind>,
    /// Whether the CSV holds data rather than a placeholder
    pub ok: bool,
}

/// Runs chart pipelines with an injected OCR engine
pub struct Dispatcher {
    config: AppConfig,
    ocr: Arc<dyn OcrEngine>,
}

impl Dispatcher {
    pub fn new(config: AppConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }

    /// Detect and reconstruct a decoded chart
    pub fn digitize(&self, raster: &RasterImage, kind: ChartKind, blocks: &[TextBlock]) -> Result<ChartSeries> {
        let series = match kind {
            ChartKind::Bar => {
                let bars = detect_bars(raster, &self.config.bars);
                if bars.is_empty() {
                    return Err(DigitizeError::DetectionEmpty { kind });
                }
                ChartSeries::Bar(reconstruct_bars(&bars, blocks))
            }
            ChartKind::Line => {
                let polyline = trace_line(raster, &self.config.line);
                if polyline.is_empty() {
                    return Err(DigitizeError::DetectionEmpty { kind });
                }
                let axes = detect_axes(raster, &self.config.axes);
                ChartSeries::Line(reconstruct_line(&polyline, &axes, blocks, self.config.calibration.margin))
            }
            ChartKind::Pie => {
                let segmentation = segment_pie(raster, &self.config.pie);
                if segmentation.slices.is_empty() {
                    return Err(DigitizeError::DetectionEmpty { kind });
                }
                ChartSeries::Pie(reconstruct_pie(&segmentation, blocks))
            }
        };

        Ok(series)
    }

    /// Run the full pipeline for one picture file
    pub fn process_image(&self, path: &Path, kind: ChartKind) -> Result<ChartRecord> {
        let raster = RasterImage::open(path)?;
        let blocks = self.ocr.recognize(path).map_err(|e| DigitizeError::Ocr {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        let series = self.digitize(&raster, kind, &blocks)?;
        debug!("{:?}: {} {} values from {} text blocks", path, series.len(), kind, blocks.len());

        Ok(ChartRecord::from_series(series, &blocks))
    }

    /// Process one picture and write its CSV
    ///
    /// Never fails: any error is logged and leaves an empty artifact.
    /// Returns whether real data was written.
    pub fn process_to_file(&self, image: &Path, kind: ChartKind, csv: &Path) -> bool {
        let start = Instant::now();
        let outcome = self
            .process_image(image, kind)
            .and_then(|record| record.save(csv));

        match outcome {
            Ok(()) => {
                debug!("Digitized {:?} in {:.1}ms", image, start.elapsed().as_secs_f64() * 1000.0);
                true
            }
            Err(e) => {
                if e.is_benign() {
                    warn!("{:?}: {}", image, e);
                } else {
                    error!("{:?}: {}", image, e);
                }
                if let Err(e) = write_placeholder(csv) {
                    error!("Failed to write placeholder: {}", e);
                }
                false
            }
        }
    }

    /// Handle one picture of a batch according to its class
    fn process_picture(&self, image: &Path, class: PictureClass) -> Artifact {
        let csv = storage::csv_path_for(image);

        let (kind, ok) = match class {
            PictureClass::Chart(kind) => (Some(kind), self.process_to_file(image, kind, &csv)),
            _ => {
                warn!("No chart pipeline for {:?}", image);
                if let Err(e) = write_placeholder(&csv) {
                    error!("Failed to write placeholder: {}", e);
                }
                (None, false)
            }
        };

        Artifact {
            csv,
            image: image.to_path_buf(),
            kind,
            ok,
        }
    }

    /// Digitize every picture in a directory
    ///
    /// Labels come from the file names. Redundant picture classes are
    /// skipped. Artifacts are returned in file name order.
    pub fn run_batch(&self, dir: &Path) -> anyhow::Result<Vec<Artifact>> {
        let start = Instant::now();
        let pictures = storage::list_pictures(dir, &self.config.output.image_extension)?;

        let jobs: Vec<(usize, PathBuf, PictureClass)> = pictures
            .into_iter()
            .filter_map(|path| {
                let class = label_from_path(&path).map_or(PictureClass::Unsupported, |l| PictureClass::from_label(&l));
                if class == PictureClass::Redundant {
                    debug!("Skipping {:?}", path);
                    return None;
                }
                Some((path, class))
            })
            .enumerate()
            .map(|(index, (path, class))| (index, path, class))
            .collect();

        if jobs.is_empty() {
            info!("No chart pictures in {:?}", dir);
            return Ok(Vec::new());
        }

        let workers = self.config.performance.worker_count().min(jobs.len());
        info!("Processing {} pictures with {} workers", jobs.len(), workers);

        let (job_tx, job_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();
        for job in jobs {
            job_tx.send(job)?;
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, image, class) in job_rx.iter() {
                        let artifact = self.process_picture(&image, class);
                        if result_tx.send((index, artifact)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, Artifact)> = result_rx.iter().collect();
        results.sort_by_key(|(index, _)| *index);
        let artifacts: Vec<Artifact> = results.into_iter().map(|(_, artifact)| artifact).collect();

        let ok = artifacts.iter().filter(|a| a.ok).count();
        info!(
            "Batch done: {}/{} charts digitized in {:.2}s",
            ok,
            artifacts.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use tempfile::TempDir;

    /// Returns the same blocks for every image
    struct FixedOcr(Vec<TextBlock>);

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image_path: &Path) -> anyhow::Result<Vec<TextBlock>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image_path: &Path) -> anyhow::Result<Vec<TextBlock>> {
            anyhow::bail!("engine unavailable")
        }
    }

    fn axis_blocks() -> Vec<TextBlock> {
        vec![
            TextBlock::from_rect("0", 5.0, 195.0, 10.0, 10.0),
            TextBlock::from_rect("100", 5.0, -5.0, 10.0, 10.0),
        ]
    }

    fn dispatcher(ocr: impl OcrEngine + 'static) -> Dispatcher {
        let mut config = AppConfig::default();
        config.performance.workers = Some(2);
        Dispatcher::new(config, Arc::new(ocr))
    }

    fn write_bar_chart(path: &Path) {
        let mut img = GrayImage::from_pixel(300, 220, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(60, 160).of_size(40, 40), Luma([0]));
        draw_filled_rect_mut(&mut img, Rect::at(180, 40).of_size(40, 160), Luma([0]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(ChartKind::from_label("bar_chart"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::from_label("stacked_bar_chart"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::from_label("line_chart"), Some(ChartKind::Line));
        assert_eq!(ChartKind::from_label("pie_chart"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::from_label("flow_chart"), None);
    }

    #[test]
    fn test_picture_class() {
        assert_eq!(PictureClass::from_label("logo"), PictureClass::Redundant);
        assert_eq!(PictureClass::from_label("qr_code"), PictureClass::Redundant);
        assert_eq!(PictureClass::from_label("pie_chart"), PictureClass::Chart(ChartKind::Pie));
        assert_eq!(PictureClass::from_label("flow_chart"), PictureClass::Unsupported);
    }

    #[test]
    fn test_label_from_path() {
        assert_eq!(
            label_from_path(Path::new("/out/DOC-1-picture-3-bar_chart.png")).as_deref(),
            Some("bar_chart")
        );
        assert_eq!(label_from_path(Path::new("plain.png")), None);
    }

    #[test]
    fn test_process_bar_chart() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("chart.png");
        write_bar_chart(&image);

        let record = dispatcher(FixedOcr(axis_blocks())).process_image(&image, ChartKind::Bar).unwrap();
        let ChartRecord::Bar { texts, values } = record else {
            panic!("expected a bar record");
        };
        assert_eq!(texts, vec!["0", "100"]);
        assert_eq!(values.len(), 2);
        assert!((values[0] - 20.0).abs() <= 1.5);
        assert!((values[1] - 80.0).abs() <= 1.5);
    }

    #[test]
    fn test_blank_image_is_detection_empty() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("blank.png");
        GrayImage::from_pixel(100, 100, Luma([255])).save(&image).unwrap();

        let result = dispatcher(FixedOcr(Vec::new())).process_image(&image, ChartKind::Bar);
        assert!(matches!(result, Err(DigitizeError::DetectionEmpty { kind: ChartKind::Bar })));
    }

    #[test]
    fn test_failures_leave_placeholder() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("broken.png");
        std::fs::write(&image, b"not a png").unwrap();
        let csv = dir.path().join("broken.csv");

        let ok = dispatcher(FixedOcr(Vec::new())).process_to_file(&image, ChartKind::Line, &csv);
        assert!(!ok);
        assert_eq!(std::fs::metadata(&csv).unwrap().len(), 0);
    }

    #[test]
    fn test_ocr_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("chart.png");
        write_bar_chart(&image);

        let result = dispatcher(FailingOcr).process_image(&image, ChartKind::Bar);
        assert!(matches!(result, Err(DigitizeError::Ocr { .. })));
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        write_bar_chart(&dir.path().join("DOC-picture-1-bar_chart.png"));
        std::fs::write(dir.path().join("DOC-picture-2-line_chart.png"), b"garbage").unwrap();
        write_bar_chart(&dir.path().join("DOC-picture-3-logo.png"));
        write_bar_chart(&dir.path().join("DOC-picture-4-flow_chart.png"));
        write_bar_chart(&dir.path().join("DOC-picture-5-bar_chart.png"));

        let artifacts = dispatcher(FixedOcr(axis_blocks())).run_batch(dir.path()).unwrap();

        let names: Vec<_> = artifacts
            .iter()
            .map(|a| a.csv.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "DOC-picture-1-bar_chart.csv",
                "DOC-picture-2-line_chart.csv",
                "DOC-picture-4-flow_chart.csv",
                "DOC-picture-5-bar_chart.csv",
            ]
        );
        let ok: Vec<bool> = artifacts.iter().map(|a| a.ok).collect();
        assert_eq!(ok, vec![true, false, false, true]);

        for artifact in &artifacts {
            assert!(artifact.csv.is_file());
        }
        assert!(!dir.path().join("DOC-picture-3-logo.csv").exists());

        let content = std::fs::read_to_string(dir.path().join("DOC-picture-5-bar_chart.csv")).unwrap();
        assert!(content.starts_with("0,100\r\n"));
    }

    #[test]
    fn test_batch_on_empty_directory() {
        let dir = TempDir::new().unwrap();
        let artifacts = dispatcher(FixedOcr(Vec::new())).run_batch(dir.path()).unwrap();
        assert!(artifacts.is_empty());
    }
}
