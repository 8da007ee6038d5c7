//! rxtally Storage - Cached Query Fetching
//!
//! The read-through cache that sits between a report and its remote query
//! source, plus the HTTP source used in production.

pub mod cache;
pub mod source;

pub use cache::{
    ArtifactError, ArtifactMeta, CacheKey, CacheRead, CacheStats, CachedQueryFetcher,
};
pub use source::{HttpQuerySource, QueryResponse, ResponseColumn};
