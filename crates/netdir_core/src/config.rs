//! Runtime configuration for directory front ends.
//!
//! # Invariants
//! - `app_id` is a single path segment; it scopes every collection path.
//! - `log_dir`, when set, is absolute (enforced again by `init_logging`).

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_APP_ID: &str = "network-graph-default-app-id";
pub const DEFAULT_DB_FILE_NAME: &str = "netdir.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidAppId(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAppId(value) => write!(
                f,
                "app id `{value}` is invalid; expected [A-Za-z0-9._-] without path separators"
            ),
            Self::RelativeLogDir(path) => {
                write!(f, "log dir must be absolute, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    app_id: String,
    db_path: PathBuf,
    log_level: String,
    log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn new(app_id: &str, db_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            app_id: normalize_app_id(app_id)?,
            db_path: db_path.into(),
            ..Self::default()
        })
    }

    /// Enables file logging under `log_dir` at `level`.
    pub fn with_logging(
        mut self,
        level: impl Into<String>,
        log_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let log_dir = log_dir.into();
        if !log_dir.is_absolute() {
            return Err(ConfigError::RelativeLogDir(log_dir));
        }
        self.log_level = level.into();
        self.log_dir = Some(log_dir);
        Ok(self)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

fn normalize_app_id(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    let valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if !valid {
        return Err(ConfigError::InvalidAppId(value.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_APP_ID};

    #[test]
    fn default_uses_shared_app_id() {
        assert_eq!(AppConfig::default().app_id(), DEFAULT_APP_ID);
        assert!(AppConfig::default().log_dir().is_none());
    }

    #[test]
    fn app_id_rejects_path_separators() {
        assert!(matches!(
            AppConfig::new("a/b", "db.sqlite3"),
            Err(ConfigError::InvalidAppId(_))
        ));
        assert!(AppConfig::new("..", "db.sqlite3").is_err());
        assert_eq!(
            AppConfig::new(" team-1 ", "db.sqlite3").unwrap().app_id(),
            "team-1"
        );
    }

    #[test]
    fn logging_requires_absolute_dir() {
        let config = AppConfig::new("demo", "db.sqlite3").unwrap();
        assert!(matches!(
            config.clone().with_logging("info", "logs"),
            Err(ConfigError::RelativeLogDir(_))
        ));
        let dir = std::env::temp_dir();
        let config = config.with_logging("debug", dir.clone()).unwrap();
        assert_eq!(config.log_dir(), Some(dir.as_path()));
        assert_eq!(config.log_level(), "debug");
    }
}
