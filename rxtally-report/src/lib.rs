//! rxtally Report - injectable medicines in English primary care.
//!
//! Fetches the monthly prescribing extract through the result cache and
//! turns it into a preview, a chart series and a product ranking.

pub mod error;
pub mod output;
pub mod report;

pub use error::ReportError;
pub use report::{build_report, load_extract, InjectableReport, CHART_TITLE};
