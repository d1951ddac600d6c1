//! Arrow schema for the exported criteria table.

use arrow::datatypes::{DataType, Field, Schema};

use crate::criteria::REQUIRED_COLUMNS;

/// Schema of `inclusion_exclusion_criteria`: every column is nullable text.
pub fn criteria_table_schema() -> Schema {
    Schema::new(
        REQUIRED_COLUMNS
            .iter()
            .map(|&name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_schema_has_expected_fields() {
        let schema = criteria_table_schema();
        assert_eq!(schema.fields().len(), 7);
        assert_eq!(schema.field(0).name(), "nct_id");
        assert!(schema.field_with_name("exclusion_criteria").is_ok());
    }
}
