//! Pivot aggregation over one grouping column.
//!
//! Backs the aggregate view of a record browser: group the dataset by
//! the string coercion of one column and report, per group, the record
//! count and the numeric sum of a value column.

use serde::Serialize;
use serde_json::Value;

use crate::{
    dataset::Dataset,
    error::{Error, Result},
};

/// Group key used for records whose grouping value is null or absent.
pub const NULL_GROUP: &str = "(none)";

/// One group of a pivot aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    /// The group's coerced key value.
    pub key: String,
    /// Number of records in the group.
    pub count: usize,
    /// Sum of the numeric values of the value column; non-numeric and
    /// absent values contribute zero.
    pub total: f64,
}

/// Groups a dataset by `row_column` and sums `value_column` per group.
///
/// Groups appear in first-appearance order of their key, matching the
/// dataset's source order.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] when either column is unknown.
///
/// # Example
///
/// ```
/// use hojear::{pivot, Dataset};
///
/// let dataset = Dataset::from_json_str(r#"[
///     {"entity_type": "CARRIER", "power_units": 12},
///     {"entity_type": "BROKER", "power_units": 3},
///     {"entity_type": "CARRIER", "power_units": 7}
/// ]"#).unwrap();
///
/// let rows = pivot(&dataset, "entity_type", "power_units").unwrap();
/// assert_eq!(rows[0].key, "CARRIER");
/// assert_eq!(rows[0].count, 2);
/// assert_eq!(rows[0].total, 19.0);
/// ```
pub fn pivot(dataset: &Dataset, row_column: &str, value_column: &str) -> Result<Vec<PivotRow>> {
    if !dataset.has_column(row_column) {
        return Err(Error::column_not_found(row_column));
    }
    if !dataset.has_column(value_column) {
        return Err(Error::column_not_found(value_column));
    }

    let mut rows: Vec<PivotRow> = Vec::new();
    let mut by_key: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for record in dataset.iter() {
        let key = record
            .text(row_column)
            .unwrap_or_else(|| NULL_GROUP.to_string());
        let value = record
            .get(value_column)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let slot = *by_key.entry(key.clone()).or_insert_with(|| {
            rows.push(PivotRow {
                key,
                count: 0,
                total: 0.0,
            });
            rows.len() - 1
        });
        rows[slot].count += 1;
        rows[slot].total += value;
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration_dataset() -> Dataset {
        Dataset::from_json_str(
            r#"[
                {"entity_type": "CARRIER", "power_units": 12, "drivers": 10},
                {"entity_type": "BROKER", "power_units": null, "drivers": 2},
                {"entity_type": "CARRIER", "power_units": 7, "drivers": "n/a"},
                {"entity_type": null, "power_units": 3, "drivers": 1}
            ]"#,
        )
        .expect("load")
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let dataset = registration_dataset();
        let rows = pivot(&dataset, "entity_type", "power_units").expect("pivot");
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["CARRIER", "BROKER", NULL_GROUP]);
    }

    #[test]
    fn test_counts_and_totals() {
        let dataset = registration_dataset();
        let rows = pivot(&dataset, "entity_type", "power_units").expect("pivot");

        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].total, 19.0);
        // Null value contributes zero, still counted
        assert_eq!(rows[1].count, 1);
        assert_eq!(rows[1].total, 0.0);
    }

    #[test]
    fn test_non_numeric_values_contribute_zero() {
        let dataset = registration_dataset();
        let rows = pivot(&dataset, "entity_type", "drivers").expect("pivot");
        // "n/a" adds nothing to the CARRIER total
        assert_eq!(rows[0].total, 10.0);
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let dataset = registration_dataset();
        assert!(matches!(
            pivot(&dataset, "nope", "power_units"),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            pivot(&dataset, "entity_type", "nope"),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}
