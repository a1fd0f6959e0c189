//! Storage Layer
//!
//! Handles CSV artifacts next to the chart pictures and the configuration
//! directory.

pub mod record;

pub use record::{format_value, write_placeholder, ChartRecord};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "chartdigitizer", "chart-digitizer")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Artifact path of a picture: same stem, `.csv` extension
pub fn csv_path_for(image: &Path) -> PathBuf {
    image.with_extension("csv")
}

/// Pictures with the given extension in a directory, sorted by file name
pub fn list_pictures(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read picture directory: {:?}", dir))?;

    let mut pictures = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            pictures.push(path);
        }
    }
    pictures.sort();

    Ok(pictures)
}

/// `(csv, image)` pairs already present in a directory, in picture order
pub fn list_artifacts(dir: &Path, extension: &str) -> Result<Vec<(PathBuf, PathBuf)>> {
    Ok(list_pictures(dir, extension)?
        .into_iter()
        .map(|image| (csv_path_for(&image), image))
        .filter(|(csv, _)| csv.is_file())
        .collect())
}
