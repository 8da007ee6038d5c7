//! Aggregation and reshape stage.
//!
//! Pure functions over [`Table`]s. Every column reference is resolved against
//! the schema before any row is touched, so a bad column name fails with
//! [`SchemaError`] and never yields a partial result.

use crate::{
    Column, ColumnType, Schema, SchemaError, Table, TallyResult, ValidationError, Value,
};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Running sum for one measure column.
#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Int(i64),
    Float(f64),
}

impl Accumulator {
    fn zero(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Float => Accumulator::Float(0.0),
            _ => Accumulator::Int(0),
        }
    }

    fn add(&mut self, value: &Value, column: &str) -> Result<(), ValidationError> {
        match (self, value) {
            (_, Value::Null) => {}
            (Accumulator::Int(acc), Value::Int(v)) => {
                *acc = acc.checked_add(*v).ok_or_else(|| ValidationError::Overflow {
                    column: column.to_string(),
                })?;
            }
            (Accumulator::Float(acc), Value::Float(v)) => *acc += *v,
            // Table construction guarantees measure cells match the column type.
            _ => {}
        }
        Ok(())
    }

    fn into_value(self) -> Value {
        match self {
            Accumulator::Int(v) => Value::Int(v),
            Accumulator::Float(v) => Value::Float(v),
        }
    }
}

fn require_numeric(schema: &Schema, idx: usize) -> Result<(), SchemaError> {
    let column = &schema.columns()[idx];
    if column.ty.is_numeric() {
        Ok(())
    } else {
        Err(SchemaError::NotNumeric {
            column: column.name.clone(),
            ty: column.ty,
        })
    }
}

/// Columns that can be used as measures, in schema order.
pub fn numeric_columns(schema: &Schema) -> Vec<&str> {
    schema
        .columns()
        .iter()
        .filter(|c| c.ty.is_numeric())
        .map(|c| c.name.as_str())
        .collect()
}

/// Group rows by `group_keys` and sum `measure_columns` within each group.
///
/// Output rows follow the first-seen order of each key tuple. Null key values
/// form their own group; null measures are skipped. Repeated measure names
/// are summed once.
pub fn group_sum(
    table: &Table,
    group_keys: &[&str],
    measure_columns: &[&str],
) -> TallyResult<Table> {
    let schema = table.schema();
    let key_idx = schema.require_all(group_keys)?;

    let mut measures: Vec<&str> = Vec::with_capacity(measure_columns.len());
    for name in measure_columns {
        if !measures.contains(name) {
            measures.push(*name);
        }
    }
    let measure_idx = schema.require_all(&measures)?;
    for &idx in &measure_idx {
        require_numeric(schema, idx)?;
    }

    let mut columns: Vec<Column> = key_idx
        .iter()
        .chain(measure_idx.iter())
        .map(|&i| schema.columns()[i].clone())
        .collect();
    // A column used both as key and measure would collide in the output.
    for (pos, &idx) in measure_idx.iter().enumerate() {
        if key_idx.contains(&idx) {
            let base = format!("{}_sum", columns[key_idx.len() + pos].name);
            let mut name = base.clone();
            let mut n = 0;
            while columns.iter().any(|c| c.name == name) {
                n += 1;
                name = format!("{}_{}", base, n);
            }
            columns[key_idx.len() + pos].name = name;
        }
    }
    let out_schema = Schema::new(columns)?;

    let zero: Vec<Accumulator> = measure_idx
        .iter()
        .map(|&i| Accumulator::zero(schema.columns()[i].ty))
        .collect();

    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<Accumulator>)> = Vec::new();

    for row in table.rows() {
        let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push((key.clone(), zero.clone()));
                slots.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        let accs = &mut groups[slot].1;
        for (acc, (&idx, name)) in accs.iter_mut().zip(measure_idx.iter().zip(&measures)) {
            acc.add(&row[idx], name)?;
        }
    }

    let rows = groups
        .into_iter()
        .map(|(mut key, accs)| {
            key.extend(accs.into_iter().map(Accumulator::into_value));
            key
        })
        .collect();

    Ok(Table::from_checked(out_schema, rows))
}

/// Stable descending sort by one column. Ties keep their input order and
/// nulls go last.
pub fn sort_desc(table: &Table, by: &str) -> TallyResult<Table> {
    let idx = table.schema().require(by)?;
    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| match (a[idx].is_null(), b[idx].is_null()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b[idx].sort_cmp(&a[idx]),
    });
    Ok(Table::from_checked(table.schema().clone(), rows))
}

/// One point of a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub at: NaiveDate,
    pub total: Value,
}

/// Per-date sums in ascending date order.
///
/// Finite and restartable: [`TimeSeries::iter`] can be called any number of
/// times and always yields the same sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    measure: String,
    points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn measure(&self) -> &str {
        &self.measure
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimePoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a TimePoint;
    type IntoIter = std::slice::Iter<'a, TimePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Sum `measure_column` for each distinct value of the date column.
///
/// Rows whose date is null are left out.
pub fn time_series_sum(
    table: &Table,
    time_column: &str,
    measure_column: &str,
) -> TallyResult<TimeSeries> {
    let schema = table.schema();
    let time_idx = schema.require(time_column)?;
    let measure_idx = schema.require(measure_column)?;

    let time_ty = schema.columns()[time_idx].ty;
    if time_ty != ColumnType::Date {
        return Err(SchemaError::TypeMismatch {
            column: time_column.to_string(),
            expected: ColumnType::Date,
            got: format!("{:?}", time_ty),
        }
        .into());
    }
    require_numeric(schema, measure_idx)?;

    let zero = Accumulator::zero(schema.columns()[measure_idx].ty);
    let mut buckets: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for row in table.rows() {
        let Some(at) = row[time_idx].as_date() else {
            continue;
        };
        buckets
            .entry(at)
            .or_insert(zero)
            .add(&row[measure_idx], measure_column)?;
    }

    Ok(TimeSeries {
        measure: measure_column.to_string(),
        points: buckets
            .into_iter()
            .map(|(at, acc)| TimePoint {
                at,
                total: acc.into_value(),
            })
            .collect(),
    })
}

/// Replace every date in `column` with the first day of its month.
pub fn truncate_to_month(table: &Table, column: &str) -> TallyResult<Table> {
    let idx = table.schema().require(column)?;
    let ty = table.schema().columns()[idx].ty;
    if ty != ColumnType::Date {
        return Err(SchemaError::TypeMismatch {
            column: column.to_string(),
            expected: ColumnType::Date,
            got: format!("{:?}", ty),
        }
        .into());
    }
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if let Value::Date(d) = row[idx] {
                // Day 1 exists in every month.
                row[idx] = Value::Date(d.with_day(1).unwrap_or(d));
            }
            row
        })
        .collect();
    Ok(Table::from_checked(table.schema().clone(), rows))
}
