//! rxtally report entry point.
//!
//! Usage: `rxtally-report --config <path> [--offline] [--refresh] [--chart-csv <path>]`

use rxtally_core::{InjectableQuery, OfflineSource, RemoteSource, TallyConfig};
use rxtally_report::output::save_chart_csv;
use rxtally_report::{build_report, load_extract, ReportError};
use rxtally_storage::{CacheKey, CachedQueryFetcher, HttpQuerySource};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Default)]
struct Flags {
    offline: bool,
    refresh: bool,
    chart_csv: Option<PathBuf>,
}

impl Flags {
    fn from_args() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut flags = Flags::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--offline" => flags.offline = true,
                "--refresh" => flags.refresh = true,
                "--chart-csv" => match args.next() {
                    Some(path) => flags.chart_csv = Some(PathBuf::from(path)),
                    None => tracing::warn!("--chart-csv given without a path; no chart file written"),
                },
                // Read by TallyConfig::load.
                "--config" => {
                    if args.next().is_none() {
                        tracing::warn!("--config given without a path");
                    }
                }
                other => tracing::warn!(arg = other, "Ignoring unknown argument"),
            }
        }
        flags
    }
}

fn init_tracing() -> Result<(), ReportError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rxtally=info,warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ReportError::Logging(e.to_string()))
}

fn main() -> Result<(), ReportError> {
    init_tracing()?;
    let flags = Flags::from_args();
    let config = TallyConfig::load()?;

    let source: Box<dyn RemoteSource> = if flags.offline {
        Box::new(OfflineSource)
    } else {
        Box::new(HttpQuerySource::from_config(&config.source)?)
    };
    tracing::info!(source = source.name(), cache = %config.cache_path().display(), "Starting report");

    let fetcher = CachedQueryFetcher::new(source);
    let key = CacheKey::new(config.cache_path());
    if flags.refresh && fetcher.invalidate(&key)? {
        tracing::info!(key = %key, "Discarded cached extract");
    }

    let query = InjectableQuery::new().to_query()?;
    let (table, from_cache) = load_extract(&fetcher, &query, &key)?;
    tracing::info!(rows = table.row_count(), "Extract ready");

    let report = build_report(&table, from_cache, config.report.top_products)?;
    print!("{}", report.render(&config.display));

    if let Some(path) = &flags.chart_csv {
        save_chart_csv(path, &report.chart)?;
        tracing::info!(path = %path.display(), "Wrote chart series");
    }

    let stats = fetcher.stats();
    tracing::debug!(
        hits = stats.hits,
        misses = stats.misses,
        remote_executions = stats.remote_executions,
        "Cache statistics"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Flags {
        Flags::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_all_flags() {
        let flags = parse(&["--config", "rx.toml", "--offline", "--refresh", "--chart-csv", "out/c.csv"]);
        assert!(flags.offline);
        assert!(flags.refresh);
        assert_eq!(flags.chart_csv, Some(PathBuf::from("out/c.csv")));
    }

    #[test]
    fn test_config_value_is_not_a_flag() {
        let flags = parse(&["--config", "--offline"]);
        assert!(!flags.offline);
    }

    #[test]
    fn test_unknown_and_dangling_arguments_are_skipped() {
        let flags = parse(&["--verbose", "--chart-csv"]);
        assert!(!flags.offline);
        assert_eq!(flags.chart_csv, None);
    }
}
