//! Chart records and their CSV layout
//!
//! Row layouts per chart type:
//! - bar: OCR texts, then bar values padded with NaN to the text count
//! - line: x values, y values, OCR texts; value rows cut to the text count
//! - pie: `name,percentage` header, then one row per slice
//!
//! Rows end in CRLF. A row with no fields is a bare line terminator.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::digitize::{ChartSeries, PieSlice};
use crate::error::{DigitizeError, Result};
use crate::vision::TextBlock;

/// Serialized form of a digitized chart
#[derive(Debug, Clone, PartialEq)]
pub enum ChartRecord {
    Bar { texts: Vec<String>, values: Vec<f64> },
    Line { xs: Vec<f64>, ys: Vec<f64>, texts: Vec<String> },
    Pie { slices: Vec<PieSlice> },
}

impl ChartRecord {
    /// Build the record of a series, with the OCR texts of the same image
    pub fn from_series(series: ChartSeries, blocks: &[TextBlock]) -> Self {
        let texts: Vec<String> = blocks.iter().map(|b| b.text.clone()).collect();

        match series {
            ChartSeries::Bar(bars) => {
                let mut values: Vec<f64> = bars.into_iter().map(|b| b.value).collect();
                if values.len() < texts.len() {
                    values.resize(texts.len(), f64::NAN);
                }
                Self::Bar { texts, values }
            }
            ChartSeries::Line(points) => {
                let (xs, ys) = points.into_iter().take(texts.len()).map(|p| (p.x, p.y)).unzip();
                Self::Line { xs, ys, texts }
            }
            ChartSeries::Pie(slices) => Self::Pie { slices },
        }
    }

    /// Write the record as CSV to any writer
    pub fn write_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(writer);

        match self {
            Self::Bar { texts, values } => {
                write_row(&mut csv, texts.iter().cloned())?;
                write_row(&mut csv, values.iter().map(format_value))?;
            }
            Self::Line { xs, ys, texts } => {
                write_row(&mut csv, xs.iter().map(format_value))?;
                write_row(&mut csv, ys.iter().map(format_value))?;
                write_row(&mut csv, texts.iter().cloned())?;
            }
            Self::Pie { slices } => {
                write_row(&mut csv, ["name".to_string(), "percentage".to_string()])?;
                for slice in slices {
                    write_row(&mut csv, [slice.label.clone(), format_value(&slice.percentage)])?;
                }
            }
        }

        csv.flush()
    }

    /// Write the record to a CSV file, replacing any previous one
    pub fn save(&self, path: &Path) -> Result<()> {
        let output_err = |source| DigitizeError::Output {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(output_err)?;
        self.write_csv(file).map_err(output_err)
    }
}

/// Write one row; an empty row becomes a bare terminator rather than `""`
fn write_row<W, I>(csv: &mut csv::Writer<W>, fields: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    let fields: Vec<String> = fields.into_iter().collect();
    if fields.is_empty() {
        csv.flush()?;
        return csv.get_mut().write_all(b"\r\n");
    }
    csv.write_record(&fields).map_err(io::Error::from)
}

/// Float text: `NaN` when missing, shortest round-trip decimal otherwise
pub fn format_value(value: &f64) -> String {
    format!("{:?}", value)
}

/// Create an empty artifact so every processed picture has an output file
pub fn write_placeholder(path: &Path) -> Result<()> {
    File::create(path).map(|_| ()).map_err(|source| DigitizeError::Output {
        path: path.to_path_buf(),
        source,
    })
}
