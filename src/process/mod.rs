// src/process/mod.rs

pub mod date_parser;
pub mod layout;
pub mod normalize;
pub mod reconcile;

pub use date_parser::{tag_period, Period, PeriodError};
pub use layout::Layout;
pub use normalize::{normalize_count, NormalizeError};
pub use reconcile::{reconcile, ReconcileError, ReconciledTable, COUNT_COLUMN};

/// Columns appended to every stored table, in order.
pub const PERIOD_COLUMNS: [&str; 2] = ["year", "month"];

/// Values of one output column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    Count(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedColumn {
    pub name: String,
    pub data: ColumnData,
}

/// A reconciled table with its count column normalized, stamped with the
/// reporting period of the document it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTable {
    pub columns: Vec<TaggedColumn>,
    pub period: Period,
    pub num_rows: usize,
}

impl TaggedTable {
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Output column names, including the period columns.
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(PERIOD_COLUMNS.map(String::from))
            .collect()
    }

    pub fn issuances(&self) -> &[i64] {
        match self.column(COUNT_COLUMN) {
            Some(ColumnData::Count(v)) => v,
            _ => &[],
        }
    }
}

/// Normalize the count column and attach `period`. Fails on the first count
/// cell that cannot be coerced.
pub fn tag(table: ReconciledTable, period: Period) -> Result<TaggedTable, NormalizeError> {
    let num_rows = table.num_rows();
    let count_idx = table.column_index(COUNT_COLUMN);
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = table.rows.iter().map(|r| &r[idx]);
            let data = if Some(idx) == count_idx {
                ColumnData::Count(cells.map(normalize_count).collect::<Result<_, _>>()?)
            } else {
                ColumnData::Text(cells.map(|c| c.to_string()).collect())
            };
            Ok::<_, NormalizeError>(TaggedColumn {
                name: name.clone(),
                data,
            })
        })
        .collect::<Result<Vec<_>, NormalizeError>>()?;

    Ok(TaggedTable {
        columns,
        period,
        num_rows,
    })
}
