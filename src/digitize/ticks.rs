//! Tick extraction from OCR text
//!
//! Text blocks are classified by full-match lexical patterns. Numeric
//! blocks become ticks positioned at their centroid along the requested
//! axis; alphabetic blocks are category labels; blocks containing `%` are
//! pie percentages.

use regex::Regex;
use std::sync::LazyLock;

use crate::vision::TextBlock;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("failed to compile regex"));
static CATEGORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").expect("failed to compile regex"));
static PERCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*%").expect("failed to compile regex"));

/// Image axis along which a tick is positioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal: ticks use the x centroid
    X,
    /// Vertical: ticks use the y centroid
    Y,
}

/// A numeric label anchored at a pixel position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub pixel_position: f64,
    pub value: f64,
}

/// Numeric ticks in OCR order
///
/// Surrounding whitespace is ignored; anything else around the number
/// (units, `%`) disqualifies the block.
pub fn extract_numeric_ticks<'a, I>(blocks: I, axis: Axis) -> Vec<Tick>
where
    I: IntoIterator<Item = &'a TextBlock>,
{
    blocks
        .into_iter()
        .filter_map(|block| {
            let text = block.text.trim();
            if !NUMERIC.is_match(text) {
                return None;
            }
            let value = text.parse::<f64>().ok()?;
            let (cx, cy) = block.centroid();
            let pixel_position = match axis {
                Axis::X => cx,
                Axis::Y => cy,
            };
            Some(Tick { pixel_position, value })
        })
        .collect()
}

/// Purely alphabetic blocks in OCR order
pub fn extract_category_labels(blocks: &[TextBlock]) -> Vec<&TextBlock> {
    blocks
        .iter()
        .filter(|block| CATEGORY.is_match(block.text.trim()))
        .collect()
}

/// Split blocks into `(percentages, labels)` by presence of `%`
pub fn split_percentages(blocks: &[TextBlock]) -> (Vec<&TextBlock>, Vec<&TextBlock>) {
    blocks.iter().partition(|block| block.text.contains('%'))
}

/// The number in front of the first `%` in `text`
pub fn parse_percentage(text: &str) -> Option<f64> {
    PERCENT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
