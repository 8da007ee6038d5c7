//! Writing report artifacts to disk.

use crate::ReportError;
use rxtally_core::ChartSeries;
use std::path::Path;

/// Write the chart series as CSV, creating parent directories as needed.
pub fn save_chart_csv(path: &Path, chart: &ChartSeries) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, chart.to_csv())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_save_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("chart.csv");
        let chart = ChartSeries {
            title: "items".to_string(),
            y_floor: 0.0,
            points: vec![(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), 235.0)],
        };
        save_chart_csv(&path, &chart).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,value\n2019-01-01,235\n"
        );
    }
}
