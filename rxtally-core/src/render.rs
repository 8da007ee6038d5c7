//! Text rendering for tables and chart-ready series.
//!
//! Display settings are passed per call through [`DisplayOptions`]; nothing
//! here reads process-wide state.

use crate::{Table, TimeSeries, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Formatting knobs for a single render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayOptions {
    /// Digits after the decimal point for float cells.
    pub float_precision: usize,
    /// Row limit; `None` renders every row.
    pub max_rows: Option<usize>,
    /// Character limit for a single cell; `None` is unlimited.
    pub max_colwidth: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            float_precision: 2,
            max_rows: None,
            max_colwidth: None,
        }
    }
}

impl DisplayOptions {
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_max_colwidth(mut self, width: usize) -> Self {
        self.max_colwidth = Some(width);
        self
    }

    pub fn with_float_precision(mut self, precision: usize) -> Self {
        self.float_precision = precision;
        self
    }

    fn format_cell(&self, value: &Value) -> String {
        let text = match value {
            Value::Float(f) => format!("{:.*}", self.float_precision, f),
            other => other.to_string(),
        };
        match self.max_colwidth {
            Some(width) if text.chars().count() > width => {
                let keep = width.saturating_sub(1);
                let mut cut: String = text.chars().take(keep).collect();
                cut.push('…');
                cut
            }
            _ => text,
        }
    }
}

/// Render a table as aligned plain text. Numbers are right-aligned.
pub fn render_table(table: &Table, options: &DisplayOptions) -> String {
    let columns = table.schema().columns();
    let shown = options.max_rows.unwrap_or(usize::MAX).min(table.row_count());

    let header: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let body: Vec<Vec<String>> = table.rows()[..shown]
        .iter()
        .map(|row| row.iter().map(|v| options.format_cell(v)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header, &widths, |_| false);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths, |_| false);
    for row in &body {
        push_line(&mut out, row, &widths, |i| columns[i].ty.is_numeric());
    }
    if shown < table.row_count() {
        out.push_str(&format!(
            "... {} of {} rows shown\n",
            shown,
            table.row_count()
        ));
    }
    out
}

fn push_line(
    out: &mut String,
    cells: &[String],
    widths: &[usize],
    right_align: impl Fn(usize) -> bool,
) {
    let parts: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, w))| {
            if right_align(i) {
                format!("{:>width$}", cell, width = w)
            } else {
                format!("{:<width$}", cell, width = w)
            }
        })
        .collect();
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

/// Line-chart input for an external plotter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    /// Lower bound of the y axis.
    pub y_floor: f64,
    pub points: Vec<(NaiveDate, f64)>,
}

impl ChartSeries {
    /// Build from a time series, anchoring the y axis at zero.
    pub fn from_series(title: impl Into<String>, series: &TimeSeries) -> Self {
        Self {
            title: title.into(),
            y_floor: 0.0,
            points: series
                .iter()
                .map(|p| (p.at, p.total.as_f64().unwrap_or(0.0)))
                .collect(),
        }
    }

    /// `date,value` lines with a header row.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("date,value\n");
        for (at, value) in &self.points {
            out.push_str(&format!("{},{}\n", at.format("%Y-%m-%d"), value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{time_series_sum, Column, ColumnType, Schema};

    fn table() -> Table {
        let schema = Schema::new(vec![
            Column::new("presentation", ColumnType::Text),
            Column::new("items", ColumnType::Int),
            Column::new("cost", ColumnType::Float),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![
                    Value::from("Hydroxocobalamin 1mg/1ml solution for injection"),
                    Value::Int(1200),
                    Value::Float(2345.678),
                ],
                vec![Value::from("Zoladex"), Value::Int(7), Value::Null],
                vec![Value::from("Other"), Value::Int(1), Value::Float(0.5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_float_precision() {
        let out = render_table(&table(), &DisplayOptions::default());
        assert!(out.contains("2345.68"));
        assert!(out.contains("0.50"));
        assert!(!out.contains("2345.678"));
    }

    #[test]
    fn test_max_rows_footer() {
        let out = render_table(&table(), &DisplayOptions::default().with_max_rows(1));
        assert!(out.contains("... 1 of 3 rows shown"));
        assert!(!out.contains("Zoladex"));
    }

    #[test]
    fn test_max_colwidth_truncates() {
        let out = render_table(&table(), &DisplayOptions::default().with_max_colwidth(12));
        assert!(out.contains("Hydroxocoba…"));
        assert!(!out.contains("solution"));
    }

    #[test]
    fn test_header_and_rule() {
        let out = render_table(&table().head(0), &DisplayOptions::default());
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("presentation"));
        assert!(lines[1].starts_with("------------"));
    }

    #[test]
    fn test_chart_csv() {
        let schema = Schema::new(vec![
            Column::new("month", ColumnType::Date),
            Column::new("items", ColumnType::Int),
        ])
        .unwrap();
        let d = |m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap();
        let table = Table::new(
            schema,
            vec![
                vec![Value::Date(d(2)), Value::Int(5)],
                vec![Value::Date(d(1)), Value::Int(3)],
            ],
        )
        .unwrap();
        let series = time_series_sum(&table, "month", "items").unwrap();
        let chart = ChartSeries::from_series("Total items", &series);
        assert_eq!(chart.y_floor, 0.0);
        assert_eq!(chart.to_csv(), "date,value\n2021-01-01,3\n2021-02-01,5\n");
    }
}
