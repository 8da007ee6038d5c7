//! Error types for the report binary.

use rxtally_core::{ConfigError, RemoteSourceError, TallyError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] RemoteSourceError),
    #[error(transparent)]
    Tally(#[from] TallyError),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
