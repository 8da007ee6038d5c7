//! Cached query fetcher.
//!
//! Serves a query from its cache artifact when one exists and only executes
//! it remotely on a miss. The policy is pure cache trust: an artifact is used
//! regardless of age or of the query that produced it. Removing the artifact
//! (see [`CachedQueryFetcher::invalidate`]) is the only way to refresh.
//!
//! An artifact that exists but cannot be read or decoded is reported as a
//! [`CacheError`]; the fetcher never silently re-executes the query over it.
//!
//! No locking: two processes fetching the same key may both miss and the last
//! rename wins. Writes go through a staging file, so a reader never sees a
//! partially written artifact produced by this fetcher.

use std::fs;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rxtally_core::{CacheError, Query, RemoteSource, Table, TallyResult};

use super::artifact;
use super::key::CacheKey;
use super::read::CacheRead;

/// Statistics about fetcher usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches served from an artifact.
    pub hits: u64,
    /// Fetches that found no artifact.
    pub misses: u64,
    /// Queries executed against the remote source.
    pub remote_executions: u64,
    /// Remote results that could not be persisted.
    pub write_failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    remote_executions: AtomicU64,
    write_failures: AtomicU64,
}

/// Read-through cache in front of a [`RemoteSource`].
///
/// # Example
///
/// ```ignore
/// let fetcher = CachedQueryFetcher::new(HttpQuerySource::from_config(&config.source)?);
/// let query = InjectableQuery::new().to_query()?;
/// let read = fetcher.fetch(&query, &CacheKey::new("data/df_inj.json"))?;
/// if read.was_cache_hit() {
///     tracing::info!(age = ?read.age(), "Using cached result");
/// }
/// let table = read.into_value();
/// ```
#[derive(Debug)]
pub struct CachedQueryFetcher<S> {
    source: S,
    counters: Counters,
}

impl<S: RemoteSource> CachedQueryFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            counters: Counters::default(),
        }
    }

    /// Get a reference to the remote source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the cached result for `key`, or execute `query` and cache it.
    ///
    /// On a miss the remote source is called exactly once. If the result
    /// cannot be written, the returned [`CacheError::WriteFailed`] still holds
    /// the fetched table.
    pub fn fetch(&self, query: &Query, key: &CacheKey) -> TallyResult<CacheRead<Table>> {
        if let Some(read) = self.read_artifact(query, key)? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                key = %key,
                rows = read.value().row_count(),
                cached_at = %read.cached_at(),
                "Cache hit"
            );
            return Ok(read);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, source = self.source.name(), "Cache miss, executing query");

        self.counters.remote_executions.fetch_add(1, Ordering::Relaxed);
        let table = self.source.execute(query)?;
        let cached_at = Utc::now();

        if let Err(reason) = write_artifact(key, &table, query, cached_at) {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, %reason, "Failed to persist query result");
            return Err(CacheError::WriteFailed {
                path: key.path().to_path_buf(),
                reason,
                fetched: Box::new(table),
            }
            .into());
        }

        tracing::debug!(key = %key, rows = table.row_count(), "Cached query result");
        Ok(CacheRead::from_source(table, cached_at))
    }

    /// Remove the artifact for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> TallyResult<bool> {
        match fs::remove_file(key.path()) {
            Ok(()) => {
                tracing::debug!(key = %key, "Cache artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::RemoveFailed {
                path: key.path().to_path_buf(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    /// Whether an artifact currently exists for `key`.
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        key.path().is_file()
    }

    /// Get fetcher statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            remote_executions: self.counters.remote_executions.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    fn read_artifact(&self, query: &Query, key: &CacheKey) -> TallyResult<Option<CacheRead<Table>>> {
        let bytes = match fs::read(key.path()) {
            Ok(bytes) => bytes,
            // No artifact there, including when a parent component is a regular file.
            Err(e) if e.kind() == ErrorKind::NotFound || !key.path().is_file() => {
                return Ok(None)
            }
            Err(e) => {
                return Err(CacheError::ReadFailed {
                    path: key.path().to_path_buf(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let (table, meta) = artifact::decode(&bytes).map_err(|e| CacheError::Corrupt {
            path: key.path().to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(recorded) = &meta.query_sha256 {
            let current = query.sha256_hex();
            if *recorded != current {
                tracing::warn!(
                    key = %key,
                    recorded = %recorded,
                    current = %current,
                    "Cached artifact was produced by a different query; serving it anyway"
                );
            }
        }

        Ok(Some(CacheRead::from_cache(table, meta.cached_at)))
    }
}

fn write_artifact(
    key: &CacheKey,
    table: &Table,
    query: &Query,
    cached_at: chrono::DateTime<Utc>,
) -> Result<(), String> {
    let bytes = artifact::encode(table, cached_at, Some(query.sha256_hex()))
        .map_err(|e| e.to_string())?;
    if let Some(parent) = key.path().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }
    let staging = key.staging_path();
    let written = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, key.path()));
    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(e.to_string());
    }
    Ok(())
}
