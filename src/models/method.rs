//! Backend selector.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage backend a [`UserRepository`](crate::services::UserRepository) dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Flat key-value file with per-key change listeners.
    LegacyPrefs,
    /// Key-value preferences file, migrated from the legacy store.
    Preferences,
    /// Structured single-record file, migrated from the legacy store.
    Record,
    /// Structured list-of-records file.
    #[default]
    RecordList,
    /// Relational table.
    Table,
}

impl Method {
    /// Returns all backend variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::LegacyPrefs,
            Self::Preferences,
            Self::Record,
            Self::RecordList,
            Self::Table,
        ]
    }

    /// Returns the backend name used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyPrefs => "legacy-prefs",
            Self::Preferences => "preferences",
            Self::Record => "record",
            Self::RecordList => "record-list",
            Self::Table => "table",
        }
    }

    /// Returns true if the backend stores a list keyed by code.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::RecordList | Self::Table)
    }

    /// Parses a backend name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "legacy-prefs" | "legacy" | "shared-preferences" => Some(Self::LegacyPrefs),
            "preferences" | "prefs" => Some(Self::Preferences),
            "record" => Some(Self::Record),
            "record-list" | "list" => Some(Self::RecordList),
            "table" | "sqlite" => Some(Self::Table),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips() {
        for method in Method::all() {
            assert_eq!(Method::parse(method.as_str()), Some(*method));
        }
        assert_eq!(Method::parse("SQLITE"), Some(Method::Table));
        assert_eq!(Method::parse("record_list"), Some(Method::RecordList));
        assert_eq!(Method::parse("redis"), None);
    }

    #[test]
    fn test_default_is_record_list() {
        assert_eq!(Method::default(), Method::RecordList);
    }

    #[test]
    fn test_is_list() {
        assert!(Method::Table.is_list());
        assert!(Method::RecordList.is_list());
        assert!(!Method::Record.is_list());
        assert!(!Method::LegacyPrefs.is_list());
    }
}
