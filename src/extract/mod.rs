// src/extract/mod.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod tabula;

pub use tabula::TabulaExtractor;

/// One cell of an extracted grid.
///
/// The set of cases is closed so count normalization is total over it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from raw extracted text: trims, strips wrapping quotes and
    /// folds internal line breaks (multi-line header cells) into single spaces.
    pub fn from_text(raw: &str) -> Self {
        let cleaned = clean_str(raw);
        if cleaned.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(cleaned)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the representation, used in diagnostics.
    pub fn repr(&self) -> &'static str {
        match self {
            Cell::Empty => "empty",
            Cell::Integer(_) => "integer",
            Cell::Number(_) => "number",
            Cell::Text(_) => "text",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Integer(n) => write!(f, "{}", n),
            Cell::Number(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(raw: &str) -> Self {
        Cell::from_text(raw)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Integer(n)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Number(x)
    }
}

fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unquoted.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The grid extracted from one PDF page (or one table on a page), with no
/// header assumption applied. Leading rows may be titles or other metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub rows: Vec<Vec<Cell>>,
}

impl RawPage {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Convenience for building pages from text, mostly in tests.
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|s| Cell::from_text(s.as_ref())).collect())
                .collect(),
        }
    }

    /// Widest row on the page.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when the page has no non-empty cell at all.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(Cell::is_empty)
    }

    /// Indices of columns that are empty in every row. Short rows count as
    /// empty in the positions they lack.
    pub fn empty_columns(&self) -> Vec<usize> {
        (0..self.width())
            .filter(|&c| {
                self.rows
                    .iter()
                    .all(|r| r.get(c).map_or(true, Cell::is_empty))
            })
            .collect()
    }

    /// Copy of the page with fully-empty rows and fully-empty columns removed.
    pub fn without_blank_lines(&self) -> RawPage {
        let empty = self.empty_columns();
        let keep: Vec<usize> = (0..self.width()).filter(|c| !empty.contains(c)).collect();
        let rows = self
            .rows
            .iter()
            .filter(|r| !r.iter().all(Cell::is_empty))
            .map(|r| {
                keep.iter()
                    .map(|&c| r.get(c).cloned().unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();
        RawPage { rows }
    }
}

/// Structural hints passed to the extraction backend. Pages are always
/// extracted in full and without a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMode {
    #[serde(default = "enabled")]
    pub lattice: bool,
    #[serde(default = "enabled")]
    pub stream: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ExtractionMode {
    fn default() -> Self {
        Self {
            lattice: true,
            stream: true,
        }
    }
}

/// Turns a published document into ordered per-page grids.
///
/// Implementations block; the pipeline calls them from the blocking pool.
pub trait TableExtractor {
    fn extract(&self, document: &Url, mode: &ExtractionMode) -> Result<Vec<RawPage>>;
}
