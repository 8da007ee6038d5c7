//! The injectable-medicines report.

use rxtally_core::{
    distinct_counts, group_sum, numeric_columns, render_table, sort_desc, time_series_sum,
    truncate_to_month, CacheError, ChartSeries, DisplayOptions, Query, RemoteSource, Table,
    TallyError, TallyResult, Value,
};
use rxtally_storage::{CacheKey, CachedQueryFetcher};

pub const CHART_TITLE: &str = "Total items of injectable preparations in English primary care";

const PREVIEW_ROWS: usize = 5;

/// Everything the report prints, computed from one extract.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectableReport {
    /// Whether the extract came from the cache.
    pub from_cache: bool,
    pub preview: Table,
    /// Distinct non-null values per column.
    pub distinct: Vec<(String, usize)>,
    pub presentations: Vec<Value>,
    /// Monthly total items.
    pub chart: ChartSeries,
    /// Products ranked by items, limited to the configured count.
    pub top_products: Table,
}

/// Fetch the extract, keeping a fetched result even if it could not be cached.
///
/// Returns the table and whether it was served from the cache.
pub fn load_extract<S: RemoteSource>(
    fetcher: &CachedQueryFetcher<S>,
    query: &Query,
    key: &CacheKey,
) -> TallyResult<(Table, bool)> {
    match fetcher.fetch(query, key) {
        Ok(read) => {
            let from_cache = read.was_cache_hit();
            if from_cache {
                tracing::info!(key = %key, age_secs = read.age().as_secs(), "Using cached extract");
            } else {
                tracing::info!(key = %key, "Fetched extract from remote source");
            }
            Ok((read.into_value(), from_cache))
        }
        Err(TallyError::Cache(CacheError::WriteFailed {
            path,
            reason,
            fetched,
        })) => {
            tracing::warn!(path = %path.display(), %reason, "Continuing with an uncached extract");
            Ok((*fetched, false))
        }
        Err(err) => Err(err),
    }
}

/// Build every section of the report from a fetched extract.
pub fn build_report(table: &Table, from_cache: bool, top_products: usize) -> TallyResult<InjectableReport> {
    let monthly = truncate_to_month(table, "month")?;
    let series = time_series_sum(&monthly, "month", "items")?;
    tracing::info!(months = series.len(), "Built monthly items series");

    let measures = numeric_columns(table.schema());
    let products = group_sum(table, &["bnf_code", "presentation"], &measures)?;
    let ranked = sort_desc(&products, "items")?;
    tracing::info!(products = ranked.row_count(), "Ranked products by items");

    Ok(InjectableReport {
        from_cache,
        preview: table.head(PREVIEW_ROWS),
        distinct: distinct_counts(table),
        presentations: rxtally_core::unique_values(table, "presentation")?,
        chart: ChartSeries::from_series(CHART_TITLE, &series),
        top_products: ranked.head(top_products),
    })
}

impl InjectableReport {
    /// Render all sections as plain text.
    pub fn render(&self, options: &DisplayOptions) -> String {
        let mut out = String::new();
        let origin = if self.from_cache { "cache" } else { "remote source" };
        out.push_str(&format!("Extract loaded from {}\n\n", origin));

        out.push_str(&render_table(&self.preview, options));
        out.push('\n');

        out.push_str("Distinct values per column\n");
        let width = self.distinct.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, count) in &self.distinct {
            out.push_str(&format!("{:<width$}  {}\n", name, count, width = width));
        }
        out.push('\n');

        out.push_str(&format!("{} presentations\n", self.presentations.len()));
        let shown = options
            .max_rows
            .unwrap_or(usize::MAX)
            .min(self.presentations.len());
        for value in &self.presentations[..shown] {
            out.push_str(&format!("  {}\n", value));
        }
        if shown < self.presentations.len() {
            out.push_str(&format!(
                "  ... {} of {} shown\n",
                shown,
                self.presentations.len()
            ));
        }
        out.push('\n');

        out.push_str(&format!("{}\n", self.chart.title));
        out.push_str(&self.chart.to_csv());
        out.push('\n');

        out.push_str(&format!("Top {} products by items\n", self.top_products.row_count()));
        out.push_str(&render_table(&self.top_products, options));
        out
    }
}
