// src/process/layout.rs
//
// Up-front probing of extracted page structure. Picks one of the known page
// layouts so reconciliation never has to learn it from a failed attempt.

use tracing::{debug, warn};

use super::normalize::looks_like_count;
use super::reconcile::{ReconcileError, COUNT_COLUMN, SINGULAR_COUNT_COLUMN};
use crate::extract::{Cell, RawPage};

/// How many leading rows of a page may hold titles before the header.
pub const MAX_LEADING_ROWS: usize = 3;

/// Row index of the header in the fallback and wide layouts (title, then header).
pub const SECOND_ROW: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every page repeats the page-one header.
    Uniform,
    /// Only page one carries the header; later pages start with data.
    HeaderOnFirstPage,
    /// Page one is wider than the data because of unlabeled, empty columns.
    WideFirstPage,
}

/// Outcome of probing a page sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub layout: Layout,
    /// Per page, the row holding the header (or its echo), if any.
    pub header_rows: Vec<Option<usize>>,
    /// Set when page one had no recognizable header and row two was assumed.
    pub fallback: bool,
}

impl Detection {
    pub fn header<'a>(&self, pages: &'a [RawPage]) -> &'a [Cell] {
        let row = self.header_rows[0].unwrap_or(SECOND_ROW);
        &pages[0].rows[row]
    }
}

/// Page one has unlabeled columns: some column is empty in every row.
///
/// Probes the artifacts directly instead of a fixed column count, so a
/// report that gains or loses a real column is not misread as wide.
pub fn is_wide_first_page(pages: &[RawPage]) -> bool {
    pages
        .first()
        .map_or(false, |first| !first.empty_columns().is_empty())
}

/// A header row: every cell is non-empty text and none of it reads as a count.
pub fn is_header_row(row: &[Cell]) -> bool {
    !row.is_empty()
        && row
            .iter()
            .all(|c| matches!(c, Cell::Text(_)) && !looks_like_count(c))
}

/// Same labels as `header`, position by position, over its width.
pub fn is_header_echo(row: &[Cell], header: &[Cell]) -> bool {
    row.len() >= header.len()
        && header
            .iter()
            .zip(row)
            .all(|(h, c)| h.as_text().is_some() && h.as_text() == c.as_text())
}

fn is_count_label(cell: &Cell) -> bool {
    matches!(cell.as_text(), Some(COUNT_COLUMN | SINGULAR_COUNT_COLUMN))
}

/// First leading row with the header signature, preferring one that names
/// the count column. A title split across every column also has the
/// signature.
fn find_header(page: &RawPage) -> Option<usize> {
    let leading = || page.rows.iter().take(MAX_LEADING_ROWS);
    leading()
        .position(|r| is_header_row(r) && r.iter().any(is_count_label))
        .or_else(|| leading().position(|r| is_header_row(r)))
}

fn find_echo(page: &RawPage, header: &[Cell]) -> Option<usize> {
    page.rows
        .iter()
        .take(MAX_LEADING_ROWS)
        .position(|r| is_header_echo(r, header))
}

/// Classify `pages`. For the wide layout the caller must pass pages already
/// stripped of blank rows and columns, and `wide` set.
pub fn detect(
    pages: &[RawPage],
    wide: bool,
    expects_repeated_header: bool,
) -> Result<Detection, ReconcileError> {
    let first = pages.first().ok_or(ReconcileError::NoPages)?;

    // 1) locate the page-one header
    let (header_row, fallback) = if wide {
        (SECOND_ROW, false)
    } else {
        match find_header(first) {
            Some(idx) => (idx, false),
            None => {
                warn!("no header signature on page one; assuming second row");
                (SECOND_ROW, true)
            }
        }
    };
    if first.rows.len() <= header_row {
        return Err(ReconcileError::NoHeader);
    }
    let header = &first.rows[header_row];

    // 2) look for header echoes on every later page
    let mut header_rows = Vec::with_capacity(pages.len());
    header_rows.push(Some(header_row));
    header_rows.extend(pages[1..].iter().map(|p| find_echo(p, header)));

    // 3) blank pages carry no evidence either way
    let repeated = pages[1..]
        .iter()
        .zip(&header_rows[1..])
        .all(|(p, echo)| p.is_blank() || echo.is_some());

    let layout = if wide {
        Layout::WideFirstPage
    } else if repeated && !fallback {
        Layout::Uniform
    } else {
        Layout::HeaderOnFirstPage
    };

    if expects_repeated_header && layout == Layout::HeaderOnFirstPage {
        warn!("header not repeated on every page; reusing page-one header");
    }
    debug!(?layout, header_row, fallback, "detected layout");

    Ok(Detection {
        layout,
        header_rows,
        fallback,
    })
}
