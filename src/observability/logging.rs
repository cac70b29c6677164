//! Structured logging configuration.

use crate::config::LoggingSettings;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name (`pretty` or `json`, case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// `EnvFilter` directives, e.g. `userstore=debug,info`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(None)
    }

    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `USERSTORE_LOG_FORMAT` overrides the format. The filter comes from
    /// `USERSTORE_LOG`, then `RUST_LOG`, then the settings.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>) -> Self {
        Self::from_settings_with(settings, |key| std::env::var(key).ok())
    }

    /// Like [`Self::from_settings`], reading variables through `lookup`.
    pub(crate) fn from_settings_with(
        settings: Option<&LoggingSettings>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(settings) = settings {
            if let Some(format) = settings.format.as_deref().and_then(LogFormat::parse) {
                config.format = format;
            }
            if let Some(filter) = settings.filter.clone() {
                config.filter = filter;
            }
        }
        config.apply_overrides(lookup);
        config
    }

    /// Applies overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(format) = lookup("USERSTORE_LOG_FORMAT")
            .as_deref()
            .and_then(LogFormat::parse)
        {
            self.format = format;
        }

        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(filter) = non_blank("USERSTORE_LOG").or_else(|| non_blank("RUST_LOG")) {
            self.filter = filter;
        }
    }

    /// Builds the filter, falling back to `info` if the directives are invalid.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|e| {
            tracing::warn!(filter = %self.filter, error = %e, "Invalid log filter, using default");
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" pretty "), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_settings_are_applied() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            filter: Some("debug".to_string()),
        };
        let config = LoggingConfig::from_settings_with(Some(&settings), lookup(&[]));

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn test_userstore_log_wins_over_rust_log() {
        let config = LoggingConfig::from_settings_with(
            None,
            lookup(&[
                ("USERSTORE_LOG", "userstore=trace"),
                ("RUST_LOG", "warn"),
                ("USERSTORE_LOG_FORMAT", "json"),
            ]),
        );

        assert_eq!(config.filter, "userstore=trace");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_rust_log_fallback_and_blank_values() {
        let config = LoggingConfig::from_settings_with(
            None,
            lookup(&[("USERSTORE_LOG", "  "), ("RUST_LOG", "warn")]),
        );
        assert_eq!(config.filter, "warn");

        let config =
            LoggingConfig::from_settings_with(None, lookup(&[("USERSTORE_LOG_FORMAT", "yaml")]));
        assert_eq!(config, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_filter_falls_back() {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            filter: "userstore=notalevel".to_string(),
        };
        assert_eq!(config.env_filter().to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn test_valid_filter_is_kept() {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            filter: "warn".to_string(),
        };
        assert_eq!(config.env_filter().to_string(), "warn");
    }
}
