//! Cache keys.

use rxtally_core::Query;
use std::fmt;
use std::path::{Path, PathBuf};

/// Location of one cache artifact.
///
/// The pairing of key and query is a caller convention: the fetcher trusts
/// whatever artifact sits at the path. [`CacheKey::for_query`] derives the
/// path from the query text for callers who want a changed query to miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
}

impl CacheKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<sha256 of query text>.json`
    pub fn for_query(dir: impl AsRef<Path>, query: &Query) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", query.sha256_hex())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used while writing, renamed over the artifact once done.
    pub(crate) fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for CacheKey {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for CacheKey {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_query_is_content_addressed() {
        let a = Query::new("SELECT 1").unwrap();
        let b = Query::new("SELECT 2").unwrap();
        let ka = CacheKey::for_query("data", &a);
        assert_eq!(ka, CacheKey::for_query("data", &a));
        assert_ne!(ka, CacheKey::for_query("data", &b));
        assert!(ka.path().starts_with("data"));
        assert_eq!(ka.path().extension().unwrap(), "json");
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let key = CacheKey::new("data/df_inj.json");
        assert_eq!(key.staging_path(), PathBuf::from("data/.df_inj.json.tmp"));
    }
}
