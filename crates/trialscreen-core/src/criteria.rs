//! Per-trial eligibility records as exported by the ETL stage.
//!
//! One row per NCT ID. Criteria columns hold multi-line text; each line is
//! one criterion. Conversion from Arrow batches tolerates `Utf8` and
//! `LargeUtf8` columns and treats nulls as empty strings.

use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use thiserror::Error;

/// Columns every criteria table must carry, in export order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "nct_id",
    "url",
    "minimum_age",
    "maximum_age",
    "gender",
    "inclusion_criteria",
    "exclusion_criteria",
];

/// Default field delimiter for exported criteria tables.
///
/// Criteria text is full of commas, so the table uses a backtick instead.
pub const DEFAULT_DELIMITER: char = '`';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataFormatError {
    #[error("criteria table is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: empty nct_id")]
    EmptyNctId { row: usize },

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("unreadable criteria table: {0}")]
    Unreadable(String),
}

/// Eligibility metadata for a single trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaRecord {
    pub nct_id: String,
    pub url: String,
    /// Free-form, e.g. "18 Years". May be empty.
    pub minimum_age: String,
    /// Free-form, e.g. "N/A". May be empty.
    pub maximum_age: String,
    /// Usually ALL, MALE or FEMALE.
    pub gender: String,
    pub inclusion_criteria: Vec<String>,
    pub exclusion_criteria: Vec<String>,
}

/// Split a criteria column into one entry per line.
///
/// Order is preserved and nothing is dropped: an empty column gives `[""]`.
/// A trailing carriage return on each line is removed.
pub fn split_criteria(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Build records from Arrow batches holding a criteria table.
///
/// `schema` is the result schema of the query; it is checked even when
/// `batches` is empty so a header-only file still reports missing columns.
/// Column names match case-insensitively.
pub fn records_from_batches(
    schema: &Schema,
    batches: &[RecordBatch],
) -> Result<Vec<CriteriaRecord>, DataFormatError> {
    let indices = resolve_columns(schema)?;
    for &idx in &indices {
        let field = schema.field(idx);
        match field.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => {}
            other => {
                return Err(DataFormatError::UnsupportedColumnType {
                    column: field.name().clone(),
                    data_type: other.to_string(),
                });
            }
        }
    }

    let mut records = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());
    let mut row_offset = 0usize;

    for batch in batches {
        for row in 0..batch.num_rows() {
            let field = |i: usize| get_string(batch.column(indices[i]).as_ref(), row);

            let nct_id = field(0).trim().to_string();
            if nct_id.is_empty() {
                return Err(DataFormatError::EmptyNctId {
                    row: row_offset + row,
                });
            }

            records.push(CriteriaRecord {
                nct_id,
                url: field(1),
                minimum_age: field(2),
                maximum_age: field(3),
                gender: field(4),
                inclusion_criteria: split_criteria(&field(5)),
                exclusion_criteria: split_criteria(&field(6)),
            });
        }
        row_offset += batch.num_rows();
    }

    Ok(records)
}

/// Map each required column to its index in `schema`.
fn resolve_columns(schema: &Schema) -> Result<Vec<usize>, DataFormatError> {
    let mut indices = Vec::with_capacity(REQUIRED_COLUMNS.len());
    let mut missing = Vec::new();

    for &name in REQUIRED_COLUMNS {
        match schema
            .fields()
            .iter()
            .position(|f| f.name().trim().eq_ignore_ascii_case(name))
        {
            Some(idx) => indices.push(idx),
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(DataFormatError::MissingColumns(missing))
    }
}

/// Read a cell as a string; nulls and unexpected types become `""`.
fn get_string(col: &dyn Array, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return arr.value(row).to_string();
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return arr.value(row).to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::criteria_table_schema;
    use arrow::array::ArrayRef;
    use arrow::datatypes::Field;
    use std::sync::Arc;

    fn batch(rows: &[[Option<&str>; 7]]) -> RecordBatch {
        let schema = Arc::new(criteria_table_schema());
        let columns: Vec<ArrayRef> = (0..7)
            .map(|c| {
                let values: Vec<Option<&str>> = rows.iter().map(|r| r[c]).collect();
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();
        RecordBatch::try_new(schema, columns).unwrap()
    }

    #[test]
    fn split_preserves_order() {
        assert_eq!(
            split_criteria("Male age 18 and older\nNo known history of prostate cancer"),
            vec!["Male age 18 and older", "No known history of prostate cancer"]
        );
    }

    #[test]
    fn split_empty_gives_single_empty_entry() {
        assert_eq!(split_criteria(""), vec![String::new()]);
    }

    #[test]
    fn split_strips_carriage_returns() {
        assert_eq!(split_criteria("a\r\nb\r"), vec!["a", "b"]);
    }

    #[test]
    fn converts_rows_in_order() {
        let b = batch(&[
            [
                Some("NCT05608694"),
                Some("https://clinicaltrials.gov/study/NCT05608694"),
                Some("18 Years"),
                Some("N/A"),
                Some("MALE"),
                Some("Male age 18 and older\nNo known history of prostate cancer"),
                Some("Lack of a rectum\nHip arthroplasty"),
            ],
            [
                Some("NCT00000002"),
                Some("https://clinicaltrials.gov/study/NCT00000002"),
                None,
                None,
                Some("ALL"),
                Some("Healthy volunteer"),
                None,
            ],
        ]);
        let records = records_from_batches(&b.schema(), &[b.clone()]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].nct_id, "NCT05608694");
        assert_eq!(records[0].exclusion_criteria, vec!["Lack of a rectum", "Hip arthroplasty"]);
        assert_eq!(records[1].minimum_age, "");
        assert_eq!(records[1].maximum_age, "");
        assert_eq!(records[1].exclusion_criteria, vec![String::new()]);
    }

    #[test]
    fn conversion_is_idempotent() {
        let b = batch(&[[
            Some("NCT1"),
            Some("u"),
            Some("1 Year"),
            Some("5 Years"),
            Some("ALL"),
            Some("a\nb"),
            Some("c"),
        ]]);
        let first = records_from_batches(&b.schema(), &[b.clone()]).unwrap();
        let second = records_from_batches(&b.schema(), &[b.clone()]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_columns_reported() {
        let schema = Schema::new(vec![
            Field::new("nct_id", DataType::Utf8, true),
            Field::new("url", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
        ]);
        let err = records_from_batches(&schema, &[]).unwrap_err();
        assert_eq!(
            err,
            DataFormatError::MissingColumns(vec![
                "minimum_age".into(),
                "maximum_age".into(),
                "inclusion_criteria".into(),
                "exclusion_criteria".into(),
            ])
        );
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let mut fields: Vec<Field> = criteria_table_schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields[1] = Field::new("URL", DataType::Utf8, true);
        let schema = Schema::new(fields);
        assert!(records_from_batches(&schema, &[]).unwrap().is_empty());
    }

    #[test]
    fn empty_nct_id_rejected() {
        let b = batch(&[
            [Some("NCT1"), None, None, None, None, None, None],
            [Some("  "), None, None, None, None, None, None],
        ]);
        let err = records_from_batches(&b.schema(), &[b.clone()]).unwrap_err();
        assert_eq!(err, DataFormatError::EmptyNctId { row: 1 });
    }

    #[test]
    fn non_string_column_rejected() {
        let schema = Schema::new(
            REQUIRED_COLUMNS
                .iter()
                .map(|&name| {
                    let dt = if name == "gender" {
                        DataType::Int64
                    } else {
                        DataType::Utf8
                    };
                    Field::new(name, dt, true)
                })
                .collect::<Vec<_>>(),
        );
        let err = records_from_batches(&schema, &[]).unwrap_err();
        assert!(matches!(err, DataFormatError::UnsupportedColumnType { ref column, .. } if column == "gender"));
    }
}
