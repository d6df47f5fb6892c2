// src/process/reconcile.rs

use rayon::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, instrument};

use super::layout::{self, is_header_echo, is_wide_first_page, Layout};
use super::PERIOD_COLUMNS;
use crate::extract::{Cell, RawPage};

/// Name of the count column in every reconciled table.
pub const COUNT_COLUMN: &str = "Issuances";
/// Spelling used by some reports; renamed to `COUNT_COLUMN`.
pub(crate) const SINGULAR_COUNT_COLUMN: &str = "Issuance";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no pages with content")]
    NoPages,
    #[error("page one has no header row")]
    NoHeader,
    #[error("header cell {index} is empty")]
    EmptyHeaderCell { index: usize },
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),
    #[error("column {0:?} clashes with a period column")]
    ReservedColumn(String),
    #[error("no Issuances column in header {columns:?}")]
    MissingCountColumn { columns: Vec<String> },
    #[error("page {page} has {width} columns but the header has {expected}")]
    NarrowPage {
        page: usize,
        width: usize,
        expected: usize,
    },
    #[error("no data rows under the header")]
    NoRows,
}

/// All pages of one document under a single header.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTable {
    pub columns: Vec<String>,
    /// Every row has exactly `columns.len()` non-empty cells.
    pub rows: Vec<Vec<Cell>>,
    pub layout: Layout,
}

impl ReconciledTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Merge per-page grids into one table with the page-one header.
///
/// Pages are concatenated in order and rows keep their order within a page.
/// Rows with any empty cell, rows repeating the header and rows leaking the
/// literal `Issuances` into the count column are dropped. A document left
/// with no rows is an error, so nothing empty is ever persisted.
#[instrument(level = "debug", skip_all, fields(pages = pages.len()))]
pub fn reconcile(
    pages: &[RawPage],
    expects_repeated_header: bool,
) -> Result<ReconciledTable, ReconcileError> {
    // 1) blank pages carry nothing
    let pages: Vec<RawPage> = pages.iter().filter(|p| !p.is_blank()).cloned().collect();
    if pages.is_empty() {
        return Err(ReconcileError::NoPages);
    }

    // 2) the wide layout is detected and reconciled on cleaned copies
    let wide = is_wide_first_page(&pages);
    let pages: Vec<RawPage> = if wide {
        pages.par_iter().map(RawPage::without_blank_lines).collect()
    } else {
        pages
    };
    let detection = layout::detect(&pages, wide, expects_repeated_header)?;
    let header = detection.header(&pages);

    // 3) canonical columns
    let columns = column_names(header)?;
    let count_idx = columns
        .iter()
        .position(|c| c == COUNT_COLUMN)
        .ok_or_else(|| ReconcileError::MissingCountColumn {
            columns: columns.clone(),
        })?;

    // 4) rows per page; collect keeps page order
    let per_page: Vec<Result<Vec<Vec<Cell>>, ReconcileError>> = pages
        .par_iter()
        .zip(detection.header_rows.par_iter())
        .enumerate()
        .map(|(idx, (page, header_row))| page_rows(idx, page, *header_row, header))
        .collect();
    let mut rows = Vec::new();
    for page in per_page {
        rows.extend(page?);
    }

    // 5) header text leaking into the data
    rows.retain(|r| r[count_idx].as_text() != Some(COUNT_COLUMN));
    if rows.is_empty() {
        return Err(ReconcileError::NoRows);
    }

    debug!(
        layout = ?detection.layout,
        columns = columns.len(),
        rows = rows.len(),
        "reconciled"
    );
    Ok(ReconciledTable {
        columns,
        rows,
        layout: detection.layout,
    })
}

fn column_names(header: &[Cell]) -> Result<Vec<String>, ReconcileError> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let name = match cell.to_string() {
                n if n.is_empty() => return Err(ReconcileError::EmptyHeaderCell { index }),
                n if n == SINGULAR_COUNT_COLUMN => COUNT_COLUMN.to_string(),
                n => n,
            };
            if PERIOD_COLUMNS.iter().any(|p| p.eq_ignore_ascii_case(&name)) {
                return Err(ReconcileError::ReservedColumn(name));
            }
            if !seen.insert(name.clone()) {
                return Err(ReconcileError::DuplicateColumn(name));
            }
            Ok(name)
        })
        .collect()
}

fn page_rows(
    idx: usize,
    page: &RawPage,
    header_row: Option<usize>,
    header: &[Cell],
) -> Result<Vec<Vec<Cell>>, ReconcileError> {
    let width = header.len();

    // a narrower page with real rows would lose data under positional alignment
    let has_full_rows = page
        .rows
        .iter()
        .any(|r| r.len() > 1 && r.iter().all(|c| !c.is_empty()));
    if page.width() < width && has_full_rows {
        return Err(ReconcileError::NarrowPage {
            page: idx + 1,
            width: page.width(),
            expected: width,
        });
    }

    let skip = header_row.map_or(0, |h| h + 1);
    Ok(page
        .rows
        .iter()
        .skip(skip)
        .filter(|r| r.len() >= width && r[..width].iter().all(|c| !c.is_empty()))
        .filter(|r| !is_header_echo(r, header))
        .map(|r| r[..width].to_vec())
        .collect())
}
