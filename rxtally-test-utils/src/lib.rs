//! rxtally Test Utilities
//!
//! Centralized test infrastructure for the rxtally workspace:
//! - Scripted remote sources that count and record executions
//! - Proptest generators for schemas and tables
//! - Fixtures shaped like the injectable-medicines result

pub use rxtally_core::{
    Column, ColumnType, InjectableQuery, Query, RemoteSource, RemoteSourceError, Schema, Table,
    TallyError, TallyResult, Value,
};

use chrono::NaiveDate;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

// ============================================================================
// STUB SOURCES
// ============================================================================

#[derive(Debug)]
enum Behaviour {
    /// Pop the next scripted response; fail with `ExecutionFailed` once empty.
    Scripted(RefCell<VecDeque<Result<Table, RemoteSourceError>>>),
    Always(Result<Table, RemoteSourceError>),
    /// Panic on any execution.
    Forbidden,
}

/// Remote source stub that counts calls and records the queries it saw.
#[derive(Debug)]
pub struct StubSource {
    name: String,
    behaviour: Behaviour,
    calls: Cell<usize>,
    seen: RefCell<Vec<String>>,
}

impl StubSource {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            name: "stub".to_string(),
            behaviour,
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Always returns a clone of `table`.
    pub fn returning(table: Table) -> Self {
        Self::with_behaviour(Behaviour::Always(Ok(table)))
    }

    /// Always fails with `err`.
    pub fn failing(err: RemoteSourceError) -> Self {
        Self::with_behaviour(Behaviour::Always(Err(err)))
    }

    /// Returns the given responses in order, then fails.
    pub fn scripted(responses: Vec<Result<Table, RemoteSourceError>>) -> Self {
        Self::with_behaviour(Behaviour::Scripted(RefCell::new(responses.into())))
    }

    /// Panics if executed. For asserting the cache short-circuits.
    pub fn forbidden() -> Self {
        Self::with_behaviour(Behaviour::Forbidden)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn queries(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl RemoteSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, query: &Query) -> Result<Table, RemoteSourceError> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push(query.as_str().to_string());
        match &self.behaviour {
            Behaviour::Always(result) => result.clone(),
            Behaviour::Scripted(queue) => queue.borrow_mut().pop_front().unwrap_or_else(|| {
                Err(RemoteSourceError::ExecutionFailed {
                    source_name: self.name.clone(),
                    reason: "script exhausted".to_string(),
                })
            }),
            Behaviour::Forbidden => panic!(
                "remote source {} executed but the test forbids it: {}",
                self.name,
                query.as_str()
            ),
        }
    }
}

/// The error most tests use for a broken warehouse.
pub fn remote_down() -> RemoteSourceError {
    RemoteSourceError::Transport {
        source_name: "stub".to_string(),
        reason: "connection refused".to_string(),
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).expect("first of month is valid")
}

/// A small table with the injectable query's schema.
pub fn injectable_fixture() -> Table {
    let rows = vec![
        ("00C", month(2019, 1), "Hydroxocobalamin 1mg/1ml soln for inj amps", "0901020G0AAAAAA", 120, 310.55),
        ("00C", month(2019, 2), "Hydroxocobalamin 1mg/1ml soln for inj amps", "0901020G0AAAAAA", 98, 254.10),
        ("00C", month(2019, 1), "Medroxyprogesterone 104mg/0.65ml inj pf syr", "0703020M0AAAEAE", 40, 276.00),
        ("01A", month(2019, 1), "Hydroxocobalamin 1mg/1ml soln for inj amps", "0901020G0AAAAAA", 75, 194.20),
        ("01A", month(2019, 3), "Methotrexate 10mg/0.2ml inj pf syr", "1001030U0AAAJAJ", 12, 171.36),
        ("01A", month(2019, 2), "Medroxyprogesterone 104mg/0.65ml inj pf syr", "0703020M0AAAEAE", 40, 276.00),
    ];
    let rows = rows
        .into_iter()
        .map(|(pct, at, presentation, code, items, cost)| {
            vec![
                Value::from(pct),
                Value::Date(at),
                Value::from(presentation),
                Value::from(code),
                Value::Int(items),
                Value::Float(cost),
            ]
        })
        .collect();
    Table::new(InjectableQuery::expected_schema(), rows).expect("fixture matches schema")
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub fn arb_column_type() -> impl Strategy<Value = ColumnType> {
    prop_oneof![
        Just(ColumnType::Int),
        Just(ColumnType::Float),
        Just(ColumnType::Text),
        Just(ColumnType::Date),
    ]
}

pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2040, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day <= 28 is valid"))
}

/// Floats including the awkward ones: non-finite, signed zero, subnormal.
pub fn arb_float() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => any::<f64>(),
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
        1 => Just(-0.0f64),
        1 => Just(f64::MIN_POSITIVE / 2.0),
    ]
}

/// A cell of the given type, or null.
pub fn arb_value(ty: ColumnType) -> BoxedStrategy<Value> {
    let typed: BoxedStrategy<Value> = match ty {
        ColumnType::Int => any::<i64>().prop_map(Value::Int).boxed(),
        ColumnType::Float => arb_float().prop_map(Value::Float).boxed(),
        ColumnType::Text => any::<String>().prop_map(Value::Text).boxed(),
        ColumnType::Date => arb_date().prop_map(Value::Date).boxed(),
    };
    prop_oneof![5 => typed, 1 => Just(Value::Null)].boxed()
}

/// Schemas with 1..6 uniquely named columns.
pub fn arb_schema() -> impl Strategy<Value = Schema> {
    prop::collection::vec(arb_column_type(), 1..6).prop_map(|types| {
        let columns = types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Column::new(format!("c{}", i), ty))
            .collect();
        Schema::new(columns).expect("generated names are unique")
    })
}

/// Tables of any schema with up to `max_rows` rows.
pub fn arb_table(max_rows: usize) -> impl Strategy<Value = Table> {
    arb_schema().prop_flat_map(move |schema| {
        let row: Vec<BoxedStrategy<Value>> =
            schema.columns().iter().map(|c| arb_value(c.ty)).collect();
        prop::collection::vec(row, 0..=max_rows).prop_map(move |rows| {
            Table::new(schema.clone(), rows).expect("generated rows match schema")
        })
    })
}
