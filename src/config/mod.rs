//! Configuration management.
//!
//! Configuration comes from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. A TOML file (`config.toml` in the platform config directory)
//! 3. Environment variables
//!
//! ```toml
//! data_dir = "/var/lib/userstore"
//! default_method = "table"
//!
//! [logging]
//! format = "json"
//! filter = "userstore=debug,info"
//! ```

use crate::models::Method;
use crate::observability::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "userstore";

/// Main configuration for userstore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding every backend's file.
    pub data_dir: PathBuf,
    /// Backend a new repository starts with.
    pub default_method: Method,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Default backend name, e.g. `record-list`.
    pub default_method: Option<String>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Logging section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directives.
    pub filter: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_method: Method::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Platform data directory for userstore, or `.userstore` if there is none.
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".userstore"),
        |dirs| dirs.data_dir().join(APP_DIR),
    )
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_config_file(ConfigFile::default(), |key| std::env::var(key).ok())
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::operation("read_config_file", e))?;
        let file = Self::parse(&contents)?;
        Ok(Self::from_config_file(file, |key| std::env::var(key).ok()))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/.config/userstore/config.toml` on Linux)
    /// 2. `~/.config/userstore/config.toml` on every platform
    ///
    /// Returns the environment-adjusted defaults if no file is found or it
    /// cannot be loaded.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::from_env();
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join("config.toml"),
            base_dirs.home_dir().join(".config").join(APP_DIR).join("config.toml"),
        ];
        for path in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::from_env()
    }

    /// Parses TOML configuration.
    fn parse(contents: &str) -> crate::Result<ConfigFile> {
        toml::from_str(contents).map_err(|e| crate::Error::operation("parse_config_file", e))
    }

    /// Converts a `ConfigFile` to `StoreConfig`, reading overrides through `lookup`.
    fn from_config_file(file: ConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(method) = file.default_method {
            config.set_method_name(&method, "config file");
        }

        // Env overrides
        if let Some(data_dir) = lookup("USERSTORE_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(data_dir.trim());
        }
        if let Some(method) = lookup("USERSTORE_METHOD") {
            config.set_method_name(&method, "USERSTORE_METHOD");
        }
        config.logging = LoggingConfig::from_settings_with(file.logging.as_ref(), lookup);

        config
    }

    fn set_method_name(&mut self, name: &str, source: &str) {
        match Method::parse(name) {
            Some(method) => self.default_method = method,
            None => tracing::warn!(name, source, "Unknown storage method, keeping default"),
        }
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the starting backend.
    #[must_use]
    pub const fn with_method(mut self, method: Method) -> Self {
        self.default_method = method;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogFormat;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_method, Method::RecordList);
        assert!(config.data_dir.ends_with(APP_DIR) || config.data_dir.ends_with(".userstore"));
    }

    #[test]
    fn test_file_values_are_applied() {
        let file = StoreConfig::parse(
            r#"
            data_dir = "/srv/users"
            default_method = "sqlite"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        let config = StoreConfig::from_config_file(file, no_env);

        assert_eq!(config.data_dir, PathBuf::from("/srv/users"));
        assert_eq!(config.default_method, Method::Table);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_method_keeps_default() {
        let file = StoreConfig::parse(r#"default_method = "carrier-pigeon""#).unwrap();
        let config = StoreConfig::from_config_file(file, no_env);
        assert_eq!(config.default_method, Method::RecordList);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("USERSTORE_DATA_DIR", "/tmp/override"),
            ("USERSTORE_METHOD", "record"),
        ]);
        let file = StoreConfig::parse(
            r#"
            data_dir = "/srv/users"
            default_method = "table"
            "#,
        )
        .unwrap();
        let config =
            StoreConfig::from_config_file(file, |key| env.get(key).map(ToString::to_string));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/override"));
        assert_eq!(config.default_method, Method::Record);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(StoreConfig::parse("data_dir = ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_method = \"preferences\"\n").unwrap();

        let config = StoreConfig::load_from_file(&path).unwrap();
        // USERSTORE_METHOD may be set in the environment running the tests
        if std::env::var("USERSTORE_METHOD").is_err() {
            assert_eq!(config.default_method, Method::Preferences);
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = StoreConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(crate::Error::OperationFailed { .. })));
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_data_dir("/data")
            .with_method(Method::LegacyPrefs);
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.default_method, Method::LegacyPrefs);
    }
}
