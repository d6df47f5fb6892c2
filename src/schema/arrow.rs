// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::process::{ColumnData, TaggedTable, PERIOD_COLUMNS};

/// Map a tagged column into an Arrow DataType.
///
/// - text columns (post, nationality, visa class) → Utf8
/// - the count column                             → Int64
fn map_to_arrow_type(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Text(_) => DataType::Utf8,
        ColumnData::Count(_) => DataType::Int64,
    }
}

/// Schema for `table`: its columns in order, then `year` and `month` (Int32).
pub fn build_arrow_schema(table: &TaggedTable) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .columns
        .iter()
        .map(|col| ArrowField::new(&col.name, map_to_arrow_type(&col.data), false))
        .chain(PERIOD_COLUMNS.map(|name| ArrowField::new(name, DataType::Int32, false)))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

/// One record batch holding every row of `table`.
pub fn to_record_batch(table: &TaggedTable) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);
    let n = table.num_rows;

    let mut arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|col| match &col.data {
            ColumnData::Text(v) => Arc::new(StringArray::from(v.clone())) as ArrayRef,
            ColumnData::Count(v) => Arc::new(Int64Array::from(v.clone())) as ArrayRef,
        })
        .collect();
    // period is constant per document
    arrays.push(Arc::new(Int32Array::from(vec![table.period.year; n])));
    arrays.push(Arc::new(Int32Array::from(vec![table.period.month as i32; n])));

    RecordBatch::try_new(schema, arrays)
        .with_context(|| format!("building record batch for {}", table.period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Period, TaggedColumn};
    use arrow::array::Array;

    fn sample() -> TaggedTable {
        TaggedTable {
            columns: vec![
                TaggedColumn {
                    name: "Post".into(),
                    data: ColumnData::Text(vec!["Abidjan".into(), "Accra".into()]),
                },
                TaggedColumn {
                    name: "Issuances".into(),
                    data: ColumnData::Count(vec![12, 1_003]),
                },
            ],
            period: Period::new(2021, 3).unwrap(),
            num_rows: 2,
        }
    }

    #[test]
    fn test_schema_types() {
        let schema = build_arrow_schema(&sample());
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["Post", "Issuances", "year", "month"]);
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(3).data_type(), &DataType::Int32);
    }

    #[test]
    fn test_record_batch_stamps_period() -> Result<()> {
        let batch = to_record_batch(&sample())?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);

        let month = batch
            .column(3)
            .as_any()
            .downcast_ref::<Int32Array>()
            .expect("month is Int32");
        assert_eq!(month.len(), 2);
        assert!(month.iter().all(|m| m == Some(3)));

        let counts = batch
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("Issuances is Int64");
        assert_eq!(counts.value(1), 1_003);
        Ok(())
    }
}
