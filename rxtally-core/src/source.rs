//! Remote query source contract.

use crate::{Query, RemoteSourceError, Table};

/// Something that executes a query and returns a table.
///
/// Implementations are blocking. Errors are returned as-is; callers decide
/// whether to retry.
pub trait RemoteSource {
    /// Short name used in errors and logs.
    fn name(&self) -> &str;

    /// Execute the query and return its full result.
    fn execute(&self, query: &Query) -> Result<Table, RemoteSourceError>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, query: &Query) -> Result<Table, RemoteSourceError> {
        (**self).execute(query)
    }
}

impl<T: RemoteSource + ?Sized> RemoteSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, query: &Query) -> Result<Table, RemoteSourceError> {
        (**self).execute(query)
    }
}

/// Source for offline runs: every execution fails with `NotConfigured`,
/// so only cached results can be served.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl RemoteSource for OfflineSource {
    fn name(&self) -> &str {
        "offline"
    }

    fn execute(&self, _query: &Query) -> Result<Table, RemoteSourceError> {
        Err(RemoteSourceError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_source_never_executes() {
        let query = Query::new("SELECT 1").unwrap();
        assert_eq!(
            OfflineSource.execute(&query),
            Err(RemoteSourceError::NotConfigured)
        );
        let boxed: Box<dyn RemoteSource> = Box::new(OfflineSource);
        assert_eq!(boxed.name(), "offline");
        assert!((&boxed).execute(&query).is_err());
    }
}
