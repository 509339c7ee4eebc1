//! Runtime configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve database, logging and catalog settings with defaults.
//! - Reject malformed values instead of silently falling back.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - `catalog_page_limit` is always within `1..=MAX_PAGE_LIMIT`.

use crate::ingest::{DEFAULT_CATALOG_URL, MAX_PAGE_LIMIT};
use crate::logging::default_log_level;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "TRAVELPLAN_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TRAVELPLAN_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TRAVELPLAN_LOG_DIR";
pub const ENV_CATALOG_URL: &str = "TRAVELPLAN_CATALOG_URL";
pub const ENV_CATALOG_PAGE_LIMIT: &str = "TRAVELPLAN_CATALOG_PAGE_LIMIT";

const DEFAULT_DB_FILE_NAME: &str = "travelplan.sqlite3";
const DEFAULT_CATALOG_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be an integer in 1..={max}, got `{value}`")]
    InvalidPageLimit {
        name: &'static str,
        value: String,
        max: u32,
    },
    #[error("{name} must be an http(s) URL, got `{value}`")]
    InvalidUrl { name: &'static str, value: String },
    #[error("{name} must be an absolute path, got `{value}`")]
    RelativeLogDir { name: &'static str, value: String },
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub catalog_url: String,
    pub catalog_page_limit: u32,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));

        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());

        let log_dir = match read(ENV_LOG_DIR) {
            Some(value) => {
                let path = PathBuf::from(&value);
                if !path.is_absolute() {
                    return Err(ConfigError::RelativeLogDir {
                        name: ENV_LOG_DIR,
                        value,
                    });
                }
                Some(path)
            }
            None => None,
        };

        let catalog_url = match read(ENV_CATALOG_URL) {
            Some(value) if value.starts_with("http://") || value.starts_with("https://") => value,
            Some(value) => {
                return Err(ConfigError::InvalidUrl {
                    name: ENV_CATALOG_URL,
                    value,
                })
            }
            None => DEFAULT_CATALOG_URL.to_string(),
        };

        let catalog_page_limit = match read(ENV_CATALOG_PAGE_LIMIT) {
            Some(value) => match value.parse::<u32>() {
                Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => limit,
                _ => {
                    return Err(ConfigError::InvalidPageLimit {
                        name: ENV_CATALOG_PAGE_LIMIT,
                        value,
                        max: MAX_PAGE_LIMIT,
                    })
                }
            },
            None => DEFAULT_CATALOG_PAGE_LIMIT,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            catalog_url,
            catalog_page_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_CATALOG_PAGE_LIMIT, ENV_DB_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert!(config.db_path.ends_with("travelplan.sqlite3"));
        assert_eq!(config.catalog_page_limit, 100);
        assert!(config.catalog_url.starts_with("https://api.artic.edu/"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(ENV_DB_PATH, "   ")]).unwrap();
        assert!(config.db_path.ends_with("travelplan.sqlite3"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            (ENV_DB_PATH, "/var/lib/travelplan/main.db"),
            (ENV_CATALOG_PAGE_LIMIT, "25"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/travelplan/main.db"));
        assert_eq!(config.catalog_page_limit, 25);
    }

    #[test]
    fn out_of_range_page_limit_is_rejected() {
        assert!(matches!(
            config_from(&[(ENV_CATALOG_PAGE_LIMIT, "0")]),
            Err(ConfigError::InvalidPageLimit { .. })
        ));
        assert!(matches!(
            config_from(&[(ENV_CATALOG_PAGE_LIMIT, "many")]),
            Err(ConfigError::InvalidPageLimit { .. })
        ));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        assert!(matches!(
            config_from(&[(ENV_LOG_DIR, "logs")]),
            Err(ConfigError::RelativeLogDir { .. })
        ));
    }
}
