//! chart-digitizer - Recover numeric data from rendered chart images
//!
//! Digitizes a single chart picture or a directory of extracted pictures
//! whose file names carry the chart label.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chart_digitizer::config::{self, AppConfig};
use chart_digitizer::storage;
use chart_digitizer::vision::{OcrEngine, SidecarOcr};
use chart_digitizer::{ChartKind, Dispatcher};

/// chart-digitizer - Recover numeric data from chart images
#[derive(Parser, Debug)]
#[command(name = "chart-digitizer")]
#[command(about = "Recover numeric data from rendered bar, line and pie charts")]
struct Args {
    /// Configuration file (default: <config dir>/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads for batch processing
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Digitize every `<doc>-picture-<n>-<label>` picture in a directory
    Batch {
        /// Directory of extracted chart pictures
        dir: PathBuf,
    },
    /// List the (csv, picture) artifact pairs present in a directory
    List {
        /// Directory of extracted chart pictures
        dir: PathBuf,
    },
    /// Digitize a single picture
    Image {
        /// Chart picture
        path: PathBuf,

        /// Chart label, e.g. bar_chart, line_chart, pie_chart
        #[arg(short, long)]
        kind: String,

        /// OCR text blocks (default: sidecar next to the picture)
        #[arg(long)]
        ocr: Option<PathBuf>,

        /// Output CSV (default: picture path with .csv extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = load_or_default_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.performance.workers = Some(workers);
    }

    match args.command {
        Command::Batch { dir } => {
            let ocr: Arc<dyn OcrEngine> = Arc::new(SidecarOcr::new(&config.output.ocr_suffix));
            let dispatcher = Dispatcher::new(config, ocr);

            let artifacts = dispatcher.run_batch(&dir)?;
            for artifact in &artifacts {
                println!("{}\t{}", artifact.csv.display(), artifact.image.display());
            }
        }
        Command::List { dir } => {
            for (csv, image) in storage::list_artifacts(&dir, &config.output.image_extension)? {
                println!("{}\t{}", csv.display(), image.display());
            }
        }
        Command::Image { path, kind, ocr, out } => {
            let chart_kind = ChartKind::from_label(&kind)
                .with_context(|| format!("No chart pipeline for label '{}'", kind))?;
            let engine: Arc<dyn OcrEngine> = match ocr {
                Some(sidecar) => Arc::new(SidecarOcr::fixed(sidecar)),
                None => Arc::new(SidecarOcr::new(&config.output.ocr_suffix)),
            };
            let csv = out.unwrap_or_else(|| storage::csv_path_for(&path));
            let dispatcher = Dispatcher::new(config, engine);

            if dispatcher.process_to_file(&path, chart_kind, &csv) {
                info!("Wrote {:?}", csv);
            } else {
                info!("Wrote empty artifact {:?}", csv);
            }
        }
    }

    Ok(())
}

/// Load configuration from the given file, the config directory, or defaults
fn load_or_default_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            let config = config::load_config(&config_path)?;
            info!("Loaded configuration from {:?}", config_path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}
