//! TOML configuration for hosts embedding the register core.
//!
//! # Invariants
//! - A missing config file is not an error; callers fall back to defaults.
//! - `import_chunk_size` is never zero and `log_dir` is absolute when set.

use crate::logging::default_log_level;
use crate::service::backup_service::DEFAULT_IMPORT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "giapha.toml";
pub const DEFAULT_DATABASE_FILE: &str = "giapha.sqlite3";
pub const DEFAULT_AVATAR_ROOT: &str = "storage";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost/storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GiaphaConfig {
    pub database: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub import_chunk_size: usize,
    pub avatar_root: PathBuf,
    pub public_base_url: String,
}

impl Default for GiaphaConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
            import_chunk_size: DEFAULT_IMPORT_CHUNK_SIZE,
            avatar_root: PathBuf::from(DEFAULT_AVATAR_ROOT),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

impl GiaphaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.import_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "import_chunk_size must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Loads and validates config from `path` (or `giapha.toml`).
///
/// Returns `Ok(None)` only when no path was given and `giapha.toml` is
/// absent; an explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Option<GiaphaConfig>, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default_path.exists() {
                return Ok(None);
            }
            default_path
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config: GiaphaConfig =
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
    config.validate()?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::{load_config, ConfigError, GiaphaConfig, DEFAULT_CONFIG_FILE};
    use std::path::{Path, PathBuf};

    #[test]
    fn absent_default_file_yields_none() {
        assert!(!Path::new(DEFAULT_CONFIG_FILE).exists());
        assert!(load_config(None).unwrap().is_none());
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        match load_config(Some(&path)).unwrap_err() {
            ConfigError::Read { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("giapha.toml");
        std::fs::write(&path, "database = \"family.db\"\nimport_chunk_size = 100\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database, PathBuf::from("family.db"));
        assert_eq!(config.import_chunk_size, 100);
        assert_eq!(config.public_base_url, GiaphaConfig::default().public_base_url);
    }

    #[test]
    fn rejects_zero_chunk_size_and_relative_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("giapha.toml");

        std::fs::write(&path, "import_chunk_size = 0\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)).unwrap_err(),
            ConfigError::Invalid(_)
        ));

        std::fs::write(&path, "log_dir = \"logs\"\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("giapha.toml");
        std::fs::write(&path, "import_chunk_size = \"many\"\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
