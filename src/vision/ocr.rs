//! OCR collaborator interface
//!
//! Text recognition itself happens outside this crate. Engines are explicit
//! service objects: `main` builds one, hands it to the dispatcher, and it is
//! dropped when the run ends. Engines must be shareable across the batch
//! workers; a backend that cannot be called concurrently goes behind
//! [`SerializedOcr`], which takes a lock around every call.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::TextBlock;

/// Source of recognized text blocks for a chart image
pub trait OcrEngine: Send + Sync {
    /// Recognize the text blocks of the image at `image_path`
    fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>>;
}

/// An OCR backend that is not safe to call from several threads at once
pub trait OcrBackend: Send {
    /// Recognize the text blocks of the image at `image_path`
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<TextBlock>>;
}

/// Serializes calls into a non-reentrant backend
pub struct SerializedOcr<B: OcrBackend> {
    inner: Mutex<B>,
}

impl<B: OcrBackend> SerializedOcr<B> {
    /// Wrap a backend; it is loaded once by the caller and reused for every image
    pub fn new(backend: B) -> Self {
        Self {
            inner: Mutex::new(backend),
        }
    }

    /// Take the backend back, e.g. to dispose of it explicitly
    pub fn into_inner(self) -> B {
        self.inner.into_inner()
    }
}

impl<B: OcrBackend> OcrEngine for SerializedOcr<B> {
    fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>> {
        self.inner.lock().recognize(image_path)
    }
}

/// Reads text blocks written by an external OCR run
///
/// By default the blocks of `chart.png` are expected in `chart.ocr.json`,
/// a JSON array of `{"text", "bbox", "conf"}` objects.
#[derive(Debug, Clone)]
pub struct SidecarOcr {
    /// Suffix replacing the image extension
    suffix: String,
    /// Fixed sidecar used for every image instead of the derived one
    fixed_path: Option<PathBuf>,
}

impl SidecarOcr {
    /// Derive sidecar paths from image paths with the given suffix
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            fixed_path: None,
        }
    }

    /// Always read the given sidecar file
    pub fn fixed(path: PathBuf) -> Self {
        Self {
            suffix: String::new(),
            fixed_path: Some(path),
        }
    }

    /// Sidecar path for an image
    pub fn sidecar_path(&self, image_path: &Path) -> PathBuf {
        if let Some(path) = &self.fixed_path {
            return path.clone();
        }
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        image_path.with_file_name(format!("{}{}", stem, self.suffix))
    }
}

impl OcrEngine for SidecarOcr {
    fn recognize(&self, image_path: &Path) -> Result<Vec<TextBlock>> {
        let path = self.sidecar_path(image_path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read OCR sidecar: {:?}", path))?;
        let blocks: Vec<TextBlock> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse OCR sidecar: {:?}", path))?;

        debug!("Loaded {} text blocks from {:?}", blocks.len(), path);
        Ok(blocks)
    }
}
