//! Typed tabular results.
//!
//! A [`Table`] is an ordered sequence of rows checked against a [`Schema`] at
//! construction. Tables are immutable: every reshape produces a new table.

use crate::{ColumnType, SchemaError, TallyResult, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered column list with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    // Caller guarantees the names are unique.
    pub(crate) fn from_unique(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a column name to its index, failing with `MissingColumn`.
    pub fn require(&self, name: &str) -> Result<usize, SchemaError> {
        self.index_of(name).ok_or_else(|| SchemaError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Resolve every name, failing on the first absent one.
    pub fn require_all(&self, names: &[&str]) -> Result<Vec<usize>, SchemaError> {
        names.iter().map(|n| self.require(n)).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl TryFrom<Vec<Column>> for Schema {
    type Error = SchemaError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

/// Tabular result: schema plus rows aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking arity and value types of every row.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> TallyResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            check_row(&schema, i, row)?;
        }
        Ok(Self { schema, rows })
    }

    /// An empty table with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, name: &str) -> TallyResult<impl Iterator<Item = &Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// First `n` rows as a new table.
    pub fn head(&self, n: usize) -> Table {
        Table {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn into_parts(self) -> (Schema, Vec<Vec<Value>>) {
        (self.schema, self.rows)
    }

    // Rows already known to satisfy the schema (derived from a checked table).
    pub(crate) fn from_checked(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }
}

fn check_row(schema: &Schema, row_idx: usize, row: &[Value]) -> Result<(), SchemaError> {
    if row.len() != schema.len() {
        return Err(SchemaError::ArityMismatch {
            row: row_idx,
            expected: schema.len(),
            got: row.len(),
        });
    }
    for (column, value) in schema.columns().iter().zip(row) {
        if let Some(ty) = value.column_type() {
            if ty != column.ty {
                return Err(SchemaError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.ty,
                    got: format!("{:?}", ty),
                });
            }
        }
    }
    Ok(())
}

/// Row-at-a-time builder.
#[derive(Debug)]
pub struct TableBuilder {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) -> TallyResult<&mut Self> {
        check_row(&self.schema, self.rows.len(), &row)?;
        self.rows.push(row);
        Ok(self)
    }

    pub fn build(self) -> Table {
        Table::from_checked(self.schema, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TallyError;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("code", ColumnType::Text),
            Column::new("items", ColumnType::Int),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Schema::new(vec![
            Column::new("a", ColumnType::Int),
            Column::new("a", ColumnType::Text),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                column: "a".to_string()
            }
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Table::new(schema(), vec![vec![Value::from("A")]]).unwrap_err();
        assert!(matches!(
            err,
            TallyError::Schema(SchemaError::ArityMismatch {
                row: 0,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let err = Table::new(schema(), vec![vec![Value::from("A"), Value::Float(1.5)]])
            .unwrap_err();
        assert!(matches!(
            err,
            TallyError::Schema(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nulls_allowed_anywhere() {
        let table = Table::new(schema(), vec![vec![Value::Null, Value::Null]]).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_head_and_column_values() {
        let mut builder = TableBuilder::new(schema());
        for i in 0..5 {
            builder.push(vec![Value::from("X"), Value::Int(i)]).unwrap();
        }
        let table = builder.build();
        let head = table.head(2);
        assert_eq!(head.row_count(), 2);
        let items: Vec<_> = head.column_values("items").unwrap().cloned().collect();
        assert_eq!(items, vec![Value::Int(0), Value::Int(1)]);
        assert!(table.column_values("missing").is_err());
    }

    #[test]
    fn test_schema_serde_rejects_duplicates() {
        let json = r#"[{"name":"a","type":"int"},{"name":"a","type":"text"}]"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());
        let ok: Schema = serde_json::from_str(r#"[{"name":"a","type":"date"}]"#).unwrap();
        assert_eq!(ok.columns()[0].ty, ColumnType::Date);
    }
}
