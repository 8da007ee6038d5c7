//! End-to-end tests: fetch through the cache, then aggregate.

use chrono::NaiveDate;
use rxtally_core::{
    group_sum, numeric_columns, sort_desc, time_series_sum, truncate_to_month, CacheError,
    TallyError, Value,
};
use rxtally_storage::{CacheKey, CachedQueryFetcher};
use rxtally_test_utils::{injectable_fixture, remote_down, InjectableQuery, StubSource};
use std::fs;

#[test]
fn test_report_pipeline_from_cold_cache() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(dir.path().join("data").join("df_inj.json"));
    let query = InjectableQuery::new().to_query().unwrap();

    let fetcher = CachedQueryFetcher::new(StubSource::returning(injectable_fixture()));
    let table = fetcher.fetch(&query, &key).unwrap().into_value();
    assert_eq!(fetcher.source().queries(), vec![query.as_str().to_string()]);

    let monthly = truncate_to_month(&table, "month").unwrap();
    let series = time_series_sum(&monthly, "month", "items").unwrap();
    let points: Vec<(NaiveDate, Value)> = series
        .iter()
        .map(|p| (p.at, p.total.clone()))
        .collect();
    assert_eq!(
        points,
        vec![
            (NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), Value::Int(235)),
            (NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(), Value::Int(138)),
            (NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(), Value::Int(12)),
        ]
    );

    let measures = numeric_columns(table.schema());
    let products = group_sum(&table, &["bnf_code", "presentation"], &measures).unwrap();
    let ranked = sort_desc(&products, "items").unwrap();
    assert_eq!(ranked.row_count(), 3);
    assert_eq!(ranked.rows()[0][0], Value::from("0901020G0AAAAAA"));
    assert_eq!(ranked.rows()[0][2], Value::Int(293));
}

#[test]
fn test_warm_cache_survives_outage() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(dir.path().join("df_inj.json"));
    let query = InjectableQuery::new().to_query().unwrap();

    let warm = CachedQueryFetcher::new(StubSource::returning(injectable_fixture()));
    warm.fetch(&query, &key).unwrap();

    let cold_remote = CachedQueryFetcher::new(StubSource::failing(remote_down()));
    let read = cold_remote.fetch(&query, &key).unwrap();
    assert!(read.was_cache_hit());
    assert_eq!(cold_remote.source().calls(), 0);
}

#[test]
fn test_truncated_artifact_is_corrupt_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(dir.path().join("df_inj.json"));
    let query = InjectableQuery::new().to_query().unwrap();

    let fetcher = CachedQueryFetcher::new(StubSource::returning(injectable_fixture()));
    fetcher.fetch(&query, &key).unwrap();

    let bytes = fs::read(key.path()).unwrap();
    fs::write(key.path(), &bytes[..bytes.len() / 2]).unwrap();

    let err = fetcher.fetch(&query, &key).unwrap_err();
    assert!(matches!(err, TallyError::Cache(CacheError::Corrupt { .. })));
    assert_eq!(fetcher.source().calls(), 1);

    assert!(fetcher.invalidate(&key).unwrap());
    let read = fetcher.fetch(&query, &key).unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(read.into_value(), injectable_fixture());
}

#[test]
fn test_hash_keys_separate_queries() {
    let dir = tempfile::tempdir().unwrap();
    let default = InjectableQuery::new().to_query().unwrap();
    let narrowed = InjectableQuery::new()
        .with_practice_setting(1)
        .to_query()
        .unwrap();

    let fetcher = CachedQueryFetcher::new(StubSource::returning(injectable_fixture()));
    fetcher
        .fetch(&default, &CacheKey::for_query(dir.path(), &default))
        .unwrap();
    let read = fetcher
        .fetch(&narrowed, &CacheKey::for_query(dir.path(), &narrowed))
        .unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(fetcher.source().calls(), 2);
}
