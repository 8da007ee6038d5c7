//! rxtally Core - Tables, Aggregation, Presentation
//!
//! Typed tabular results, the remote source contract, and the pure functions
//! that reshape tables. Fetching and caching live in `rxtally-storage`; this
//! crate performs no I/O apart from reading its configuration file.

pub mod aggregate;
pub mod config;
pub mod describe;
pub mod error;
pub mod query;
pub mod render;
pub mod source;
pub mod table;
pub mod value;

pub use aggregate::{
    group_sum, numeric_columns, sort_desc, time_series_sum, truncate_to_month, TimePoint,
    TimeSeries,
};
pub use config::{ConfigError, ReportConfig, SourceConfig, TallyConfig};
pub use describe::{distinct_counts, unique_values};
pub use error::{
    CacheError, RemoteSourceError, SchemaError, TallyError, TallyResult, ValidationError,
};
pub use query::{InjectableQuery, Query};
pub use render::{render_table, ChartSeries, DisplayOptions};
pub use source::{OfflineSource, RemoteSource};
pub use table::{Column, Schema, Table, TableBuilder};
pub use value::{ColumnType, Value};
