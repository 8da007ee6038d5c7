//! Configuration loading for rxtally runs.
//!
//! All fields are required unless explicitly marked optional.

use crate::DisplayOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Directory holding cache artifacts.
    pub cache_dir: PathBuf,
    /// Artifact file name inside `cache_dir`.
    pub cache_file: String,
    pub source: SourceConfig,
    pub display: DisplayOptions,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
    /// Environment variable holding a bearer token.
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// How many products the ranking table shows.
    pub top_products: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or RXTALLY_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl TallyConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: TallyConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.cache_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache_file",
                reason: "must not be empty".to_string(),
            });
        }
        if self.source.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.source.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "source.timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(var) = &self.source.token_env {
            if var.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "source.token_env",
                    reason: "must not be empty when set".to_string(),
                });
            }
        }
        if self.display.float_precision > 12 {
            return Err(ConfigError::InvalidValue {
                field: "display.float_precision",
                reason: "must be <= 12".to_string(),
            });
        }
        if matches!(self.display.max_colwidth, Some(w) if w < 4) {
            return Err(ConfigError::InvalidValue {
                field: "display.max_colwidth",
                reason: "must be >= 4".to_string(),
            });
        }
        if self.report.top_products == 0 {
            return Err(ConfigError::InvalidValue {
                field: "report.top_products",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Full path of the cache artifact.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(&self.cache_file)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("RXTALLY_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
cache_dir = "data"
cache_file = "df_inj.json"

[source]
endpoint = "https://warehouse.example/query"
timeout_ms = 60000
token_env = "RXTALLY_TOKEN"

[display]
float_precision = 2
max_rows = 100

[report]
top_products = 100
"#;

    #[test]
    fn test_parse_valid() {
        let config = TallyConfig::from_toml(VALID).unwrap();
        config.validate().unwrap();
        assert_eq!(config.cache_path(), PathBuf::from("data/df_inj.json"));
        assert_eq!(config.display.max_rows, Some(100));
        assert_eq!(config.display.max_colwidth, None);
        assert_eq!(config.source.token_env.as_deref(), Some("RXTALLY_TOKEN"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = VALID.replace("top_products = 100", "top_products = 100\nextra = 1");
        assert!(matches!(
            TallyConfig::from_toml(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = VALID.replace("timeout_ms = 60000", "timeout_ms = 0");
        let config = TallyConfig::from_toml(&toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "source.timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_narrow_colwidth_rejected() {
        let toml = VALID.replace("max_rows = 100", "max_rows = 100\nmax_colwidth = 2");
        let config = TallyConfig::from_toml(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rxtally.toml");
        std::fs::write(&path, VALID).unwrap();
        let config = TallyConfig::from_path(&path).unwrap();
        assert_eq!(config.report.top_products, 100);
    }
}
