//! Result cache for remote queries.
//!
//! Results are stored as one self-describing artifact per [`CacheKey`]. The
//! artifact carries the schema, the rows and the time it was written, so a
//! cache hit reproduces the remote table exactly and reads report where the
//! value came from through [`CacheRead<T>`].
//!
//! # Example
//!
//! ```ignore
//! let fetcher = CachedQueryFetcher::new(source);
//! let key = CacheKey::new("data/df_inj.json");
//!
//! // First run executes remotely and writes the artifact
//! let first = fetcher.fetch(&query, &key)?;
//! assert!(first.was_cache_miss());
//!
//! // Every later run is served from disk
//! let again = fetcher.fetch(&query, &key)?;
//! assert!(again.was_cache_hit());
//!
//! // Force a refresh
//! fetcher.invalidate(&key)?;
//! ```

pub mod artifact;
pub mod fetcher;
pub mod key;
pub mod read;

pub use artifact::{ArtifactError, ArtifactMeta, ARTIFACT_FORMAT, ARTIFACT_VERSION};
pub use fetcher::{CacheStats, CachedQueryFetcher};
pub use key::CacheKey;
pub use read::CacheRead;
