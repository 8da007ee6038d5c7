//! Quick profiling views over a table.

use crate::{Table, TallyResult, Value};
use std::collections::HashSet;

/// Number of distinct non-null values per column, in schema order.
pub fn distinct_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .schema()
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let distinct: HashSet<&Value> = table
                .rows()
                .iter()
                .map(|row| &row[idx])
                .filter(|v| !v.is_null())
                .collect();
            (column.name.clone(), distinct.len())
        })
        .collect()
}

/// Distinct values of one column in first-seen order. Null is kept once.
pub fn unique_values(table: &Table, column: &str) -> TallyResult<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in table.column_values(column)? {
        if seen.insert(value) {
            out.push(value.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, ColumnType, Schema};

    fn table() -> Table {
        let schema = Schema::new(vec![
            Column::new("presentation", ColumnType::Text),
            Column::new("items", ColumnType::Int),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![Value::from("Methotrexate 10mg/0.2ml"), Value::Int(3)],
                vec![Value::Null, Value::Int(3)],
                vec![Value::from("Hydroxocobalamin 1mg/1ml"), Value::Int(7)],
                vec![Value::from("Methotrexate 10mg/0.2ml"), Value::Null],
                vec![Value::Null, Value::Int(1)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_distinct_counts_skip_null() {
        assert_eq!(
            distinct_counts(&table()),
            vec![
                ("presentation".to_string(), 2),
                ("items".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_unique_values_first_seen() {
        let values = unique_values(&table(), "presentation").unwrap();
        assert_eq!(
            values,
            vec![
                Value::from("Methotrexate 10mg/0.2ml"),
                Value::Null,
                Value::from("Hydroxocobalamin 1mg/1ml"),
            ]
        );
    }

    #[test]
    fn test_unique_values_missing_column() {
        assert!(unique_values(&table(), "bnf_name").is_err());
    }
}
