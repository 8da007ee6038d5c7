//! HTTP query source.
//!
//! Talks to a warehouse gateway that accepts `{"query": "<sql>"}` and answers
//! with a column list and row arrays. Decoding is lenient about how the
//! gateway spells types and numbers, strict about shape.

use chrono::NaiveDate;
use rxtally_core::{
    Column, ColumnType, Query, RemoteSource, RemoteSourceError, Schema, SourceConfig, Table,
    Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::time::Duration;

const SOURCE_NAME: &str = "http";

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Body returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub columns: Vec<ResponseColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<Json>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Blocking HTTP client for a query gateway.
#[derive(Debug, Clone)]
pub struct HttpQuerySource {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpQuerySource {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self, RemoteSourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport(&e))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    /// Build from config, reading the bearer token from `token_env` if set.
    ///
    /// A named token variable that is unset yields `NotConfigured`.
    pub fn from_config(config: &SourceConfig) -> Result<Self, RemoteSourceError> {
        let token = match &config.token_env {
            Some(var) => match std::env::var(var) {
                Ok(token) => Some(token),
                Err(_) => {
                    tracing::warn!(var = %var, "Token environment variable not set");
                    return Err(RemoteSourceError::NotConfigured);
                }
            },
            None => None,
        };
        Self::new(
            config.endpoint.clone(),
            Duration::from_millis(config.timeout_ms),
            token,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteSource for HttpQuerySource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn execute(&self, query: &Query) -> Result<Table, RemoteSourceError> {
        tracing::debug!(endpoint = %self.endpoint, query_sha256 = %query.sha256_hex(), "Executing remote query");

        let mut request = self.client.post(&self.endpoint).json(&QueryRequest {
            query: query.as_str(),
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|e| transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(RemoteSourceError::ExecutionFailed {
                source_name: SOURCE_NAME.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), text),
            });
        }

        let body: QueryResponse = response.json().map_err(|e| invalid(e.to_string()))?;
        let table = decode_response(SOURCE_NAME, body)?;
        tracing::debug!(rows = table.row_count(), "Remote query returned");
        Ok(table)
    }
}

fn transport(e: &reqwest::Error) -> RemoteSourceError {
    RemoteSourceError::Transport {
        source_name: SOURCE_NAME.to_string(),
        reason: e.to_string(),
    }
}

fn invalid(reason: String) -> RemoteSourceError {
    RemoteSourceError::InvalidResponse {
        source_name: SOURCE_NAME.to_string(),
        reason,
    }
}

fn parse_type(raw: &str) -> Option<ColumnType> {
    match raw.to_ascii_lowercase().as_str() {
        "int" | "integer" | "int64" | "bigint" => Some(ColumnType::Int),
        "float" | "float64" | "double" | "numeric" | "real" => Some(ColumnType::Float),
        "text" | "string" | "varchar" => Some(ColumnType::Text),
        "date" | "timestamp" | "datetime" => Some(ColumnType::Date),
        _ => None,
    }
}

fn parse_cell(cell: &Json, ty: ColumnType) -> Result<Value, String> {
    if cell.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        ColumnType::Int => match cell {
            Json::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| format!("{} is not an integer", n)),
            Json::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("{:?}: {}", s, e)),
            other => Err(format!("expected integer, found {}", other)),
        },
        ColumnType::Float => match cell {
            Json::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("{} is not a float", n)),
            Json::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("{:?}: {}", s, e)),
            other => Err(format!("expected float, found {}", other)),
        },
        ColumnType::Text => match cell {
            Json::String(s) => Ok(Value::Text(s.clone())),
            other => Err(format!("expected string, found {}", other)),
        },
        ColumnType::Date => {
            let s = cell
                .as_str()
                .ok_or_else(|| format!("expected date string, found {}", cell))?;
            // "2019-04-01", "2019-04-01T00:00:00Z" and "2019-04-01 00:00:00" all name the day.
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| format!("{:?}: {}", s, e))
        }
    }
}

/// Turn a gateway response into a typed table.
pub fn decode_response(
    source_name: &str,
    response: QueryResponse,
) -> Result<Table, RemoteSourceError> {
    let invalid = |reason: String| RemoteSourceError::InvalidResponse {
        source_name: source_name.to_string(),
        reason,
    };

    let columns = response
        .columns
        .into_iter()
        .map(|c| {
            parse_type(&c.ty)
                .map(|ty| Column::new(c.name.clone(), ty))
                .ok_or_else(|| invalid(format!("column {} has unknown type {:?}", c.name, c.ty)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let schema = Schema::new(columns).map_err(|e| invalid(e.to_string()))?;

    let mut rows = Vec::with_capacity(response.rows.len());
    for (row_idx, raw) in response.rows.iter().enumerate() {
        if raw.len() != schema.len() {
            return Err(invalid(format!(
                "row {} has {} cells, expected {}",
                row_idx,
                raw.len(),
                schema.len()
            )));
        }
        let row = raw
            .iter()
            .zip(schema.columns())
            .map(|(cell, column)| {
                parse_cell(cell, column.ty)
                    .map_err(|reason| invalid(format!("row {}, column {}: {}", row_idx, column.name, reason)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    Table::new(schema, rows).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Json) -> QueryResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_decode_lenient_numbers_and_dates() {
        let body = response(json!({
            "columns": [
                {"name": "month", "type": "TIMESTAMP"},
                {"name": "items", "type": "INTEGER"},
                {"name": "cost", "type": "float64"},
                {"name": "pct", "type": "string"}
            ],
            "rows": [
                ["2019-04-01T00:00:00Z", "12", 3.5, "00C"],
                ["2019-05-01", 7, "1.25", null]
            ]
        }));
        let table = decode_response("test", body).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.schema().column("month").unwrap().ty, ColumnType::Date);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2019, 4, 1).unwrap()),
                Value::Int(12),
                Value::Float(3.5),
                Value::from("00C"),
            ]
        );
        assert_eq!(table.rows()[1][2], Value::Float(1.25));
        assert!(table.rows()[1][3].is_null());
    }

    #[test]
    fn test_decode_empty_result_keeps_schema() {
        let body = response(json!({
            "columns": [{"name": "items", "type": "int"}],
            "rows": []
        }));
        let table = decode_response("test", body).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.schema().len(), 1);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let body = response(json!({
            "columns": [{"name": "geom", "type": "geography"}],
            "rows": []
        }));
        assert!(matches!(
            decode_response("test", body),
            Err(RemoteSourceError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let body = response(json!({
            "columns": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
            "rows": [[1]]
        }));
        let err = decode_response("test", body).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_bad_integer_rejected() {
        let body = response(json!({
            "columns": [{"name": "items", "type": "int"}],
            "rows": [["twelve"]]
        }));
        assert!(decode_response("test", body).is_err());
    }

    #[test]
    fn test_missing_token_env_is_not_configured() {
        let config = SourceConfig {
            endpoint: "http://localhost:9/query".to_string(),
            timeout_ms: 1000,
            token_env: Some("RXTALLY_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
        };
        assert_eq!(
            HttpQuerySource::from_config(&config).unwrap_err(),
            RemoteSourceError::NotConfigured
        );
    }
}
