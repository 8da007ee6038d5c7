//! Error types for rxtally operations

use crate::{ColumnType, Table};
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the remote query source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteSourceError {
    #[error("Query execution failed on {source_name}: {reason}")]
    ExecutionFailed { source_name: String, reason: String },

    #[error("Transport error talking to {source_name}: {reason}")]
    Transport { source_name: String, reason: String },

    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    #[error("No remote source configured")]
    NotConfigured,
}

/// Cache artifact errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Failed to read cache artifact {path:?}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Corrupt cache artifact {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The remote result was fetched but could not be persisted.
    /// The fetched table travels with the error so it is not lost.
    #[error("Failed to write cache artifact {path:?}: {reason}")]
    WriteFailed {
        path: PathBuf,
        reason: String,
        fetched: Box<Table>,
    },

    #[error("Failed to remove cache artifact {path:?}: {reason}")]
    RemoveFailed { path: PathBuf, reason: String },
}

impl CacheError {
    /// The in-memory result that survived a failed cache write, if any.
    pub fn recovered_table(self) -> Option<Table> {
        match self {
            CacheError::WriteFailed { fetched, .. } => Some(*fetched),
            _ => None,
        }
    }
}

/// Schema errors at the aggregation boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Column not found: {column}")]
    MissingColumn { column: String },

    #[error("Duplicate column: {column}")]
    DuplicateColumn { column: String },

    #[error("Type mismatch in column {column}: expected {expected:?}, got {got}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        got: String,
    },

    #[error("Row {row} has {got} values, schema has {expected} columns")]
    ArityMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Column {column} is {ty:?}, not numeric")]
    NotNumeric { column: String, ty: ColumnType },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Query text must not be empty")]
    EmptyQuery,

    #[error("Integer overflow while summing column {column}")]
    Overflow { column: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all rxtally errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TallyError {
    #[error("Remote source error: {0}")]
    RemoteSource(#[from] RemoteSourceError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for rxtally operations.
pub type TallyResult<T> = Result<T, TallyError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, Schema, Value};

    #[test]
    fn test_remote_source_error_display() {
        let err = RemoteSourceError::ExecutionFailed {
            source_name: "warehouse".to_string(),
            reason: "syntax error at FROM".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("warehouse"));
        assert!(msg.contains("syntax error at FROM"));
    }

    #[test]
    fn test_schema_error_display_missing_column() {
        let err = SchemaError::MissingColumn {
            column: "items".to_string(),
        };
        assert_eq!(format!("{}", err), "Column not found: items");
    }

    #[test]
    fn test_write_failed_keeps_table() {
        let schema = Schema::new(vec![Column::new("items", ColumnType::Int)]).unwrap();
        let table = Table::new(schema, vec![vec![Value::Int(3)]]).unwrap();
        let err = CacheError::WriteFailed {
            path: PathBuf::from("/nope/df.json"),
            reason: "permission denied".to_string(),
            fetched: Box::new(table.clone()),
        };
        assert!(format!("{}", err).contains("permission denied"));
        assert_eq!(err.recovered_table(), Some(table));
    }

    #[test]
    fn test_read_failed_has_no_table() {
        let err = CacheError::ReadFailed {
            path: PathBuf::from("df.json"),
            reason: "eof".to_string(),
        };
        assert!(err.recovered_table().is_none());
    }

    #[test]
    fn test_tally_error_from_variants() {
        let remote = TallyError::from(RemoteSourceError::NotConfigured);
        assert!(matches!(remote, TallyError::RemoteSource(_)));

        let schema = TallyError::from(SchemaError::MissingColumn {
            column: "x".to_string(),
        });
        assert!(matches!(schema, TallyError::Schema(_)));

        let validation = TallyError::from(ValidationError::EmptyQuery);
        assert!(matches!(validation, TallyError::Validation(_)));

        let cache = TallyError::from(CacheError::RemoveFailed {
            path: PathBuf::from("a"),
            reason: "busy".to_string(),
        });
        assert!(matches!(cache, TallyError::Cache(_)));
    }
}
