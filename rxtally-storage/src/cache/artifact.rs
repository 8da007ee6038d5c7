//! On-disk cache artifact codec.
//!
//! An artifact is a JSON document carrying the schema next to the rows, so a
//! cache hit yields exactly the columns and types the remote query returned.
//! Cells are encoded according to their column type; non-finite floats are
//! stored as the strings `"NaN"`, `"inf"` and `"-inf"`.

use chrono::{DateTime, NaiveDate, Utc};
use rxtally_core::{ColumnType, Schema, Table, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const ARTIFACT_FORMAT: &str = "rxtally-table";
pub const ARTIFACT_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for artifact encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The bytes are not a JSON document of the expected shape.
    #[error("Malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Written by something else, or by an incompatible version.
    #[error("Unsupported artifact {format} v{version}")]
    Unsupported { format: String, version: u32 },

    /// A cell does not decode as its column's type.
    #[error("Row {row}, column {column}: {reason}")]
    BadCell {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Row {row} has {got} cells, expected {expected}")]
    BadArity {
        row: usize,
        expected: usize,
        got: usize,
    },
}

/// Metadata stored alongside the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub cached_at: DateTime<Utc>,
    /// Hash of the query that produced the rows, if it was recorded.
    pub query_sha256: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    cached_at: DateTime<Utc>,
    #[serde(default)]
    query_sha256: Option<String>,
    columns: Schema,
    rows: Vec<Vec<Json>>,
}

fn encode_cell(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Int(i) => Json::from(*i),
        Value::Float(f) if f.is_nan() => Json::from("NaN"),
        Value::Float(f) if f.is_infinite() => {
            Json::from(if *f > 0.0 { "inf" } else { "-inf" })
        }
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Text(s) => Json::from(s.as_str()),
        Value::Date(d) => Json::from(d.format(DATE_FORMAT).to_string()),
    }
}

fn decode_cell(cell: &Json, ty: ColumnType) -> Result<Value, String> {
    if cell.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        ColumnType::Int => cell
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("expected integer, found {}", cell)),
        ColumnType::Float => match cell {
            Json::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("unrepresentable float {}", n)),
            Json::String(s) => match s.as_str() {
                "NaN" => Ok(Value::Float(f64::NAN)),
                "inf" => Ok(Value::Float(f64::INFINITY)),
                "-inf" => Ok(Value::Float(f64::NEG_INFINITY)),
                other => Err(format!("unknown float marker {:?}", other)),
            },
            other => Err(format!("expected float, found {}", other)),
        },
        ColumnType::Text => cell
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| format!("expected string, found {}", cell)),
        ColumnType::Date => {
            let s = cell
                .as_str()
                .ok_or_else(|| format!("expected date string, found {}", cell))?;
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| format!("bad date {:?}: {}", s, e))
        }
    }
}

/// Serialize a table into artifact bytes.
pub fn encode(
    table: &Table,
    cached_at: DateTime<Utc>,
    query_sha256: Option<String>,
) -> Result<Vec<u8>, ArtifactError> {
    let envelope = Envelope {
        format: ARTIFACT_FORMAT.to_string(),
        version: ARTIFACT_VERSION,
        cached_at,
        query_sha256,
        columns: table.schema().clone(),
        rows: table
            .rows()
            .iter()
            .map(|row| row.iter().map(encode_cell).collect())
            .collect(),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Deserialize artifact bytes back into a table.
pub fn decode(bytes: &[u8]) -> Result<(Table, ArtifactMeta), ArtifactError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.format != ARTIFACT_FORMAT || envelope.version != ARTIFACT_VERSION {
        return Err(ArtifactError::Unsupported {
            format: envelope.format,
            version: envelope.version,
        });
    }

    let schema = envelope.columns;
    let mut rows = Vec::with_capacity(envelope.rows.len());
    for (row_idx, raw) in envelope.rows.iter().enumerate() {
        if raw.len() != schema.len() {
            return Err(ArtifactError::BadArity {
                row: row_idx,
                expected: schema.len(),
                got: raw.len(),
            });
        }
        let row = raw
            .iter()
            .zip(schema.columns())
            .map(|(cell, column)| {
                decode_cell(cell, column.ty).map_err(|reason| ArtifactError::BadCell {
                    row: row_idx,
                    column: column.name.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    // Cells were decoded per column type, so the table check cannot fail on type.
    let table = Table::new(schema, rows).map_err(|e| ArtifactError::BadCell {
        row: 0,
        column: String::new(),
        reason: e.to_string(),
    })?;
    Ok((
        table,
        ArtifactMeta {
            cached_at: envelope.cached_at,
            query_sha256: envelope.query_sha256,
        },
    ))
}
