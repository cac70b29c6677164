//! Key-value preference backends.
//!
//! Both backends store the user as separate keys in a flat map:
//!
//! | Key | Value |
//! |-----|-------|
//! | `name` | string |
//! | `email` | string |
//! | `code` | integer |
//! | `profession` | string, e.g. `DAY_TRADER` |
//!
//! [`LegacyPrefsStore`] is the oldest layout, with per-key listeners.
//! [`PreferencesStore`] is the newer file, migrated from the legacy one and
//! from a secondary legacy file, [`EXTRA_LEGACY_PREFS_FILE`].

mod legacy;
mod store;

pub use legacy::{
    EXTRA_LEGACY_PREFS_FILE, KeyChange, KeyListener, LEGACY_PREFS_FILE, LegacyPrefsStore,
};
pub use store::{LegacyPrefsMigration, PREFERENCES_FILE, PreferencesStore};

use crate::models::{Profession, UserPatch, UserRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key names shared by both preference layouts.
pub mod keys {
    /// User name.
    pub const NAME: &str = "name";
    /// Contact address.
    pub const EMAIL: &str = "email";
    /// Numeric code.
    pub const CODE: &str = "code";
    /// Profession name.
    pub const PROFESSION: &str = "profession";

    /// Every user key, in record order.
    pub const ALL: [&str; 4] = [NAME, EMAIL, CODE, PROFESSION];

    /// Prefix of the keys recording that a legacy source was migrated.
    pub const MIGRATED_PREFIX: &str = "__migrated:";
}

/// A primitive preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    /// Integer value.
    Int(i32),
    /// String value.
    Str(String),
}

/// A flat map of preference keys to primitive values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, PrefValue>);

impl Preferences {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.0.get(key)
    }

    /// Returns a string value. Values of another type read as absent.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(PrefValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns an integer value. Values of another type read as absent.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.0.get(key) {
            Some(PrefValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Sets `key`, returning true if the stored value changed.
    pub fn set(&mut self, key: &str, value: PrefValue) -> bool {
        if self.0.get(key) == Some(&value) {
            return false;
        }
        self.0.insert(key.to_string(), value);
        true
    }

    /// Removes `key`, returning its old value.
    pub fn remove(&mut self, key: &str) -> Option<PrefValue> {
        self.0.remove(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if any user key is stored. Migration markers don't count.
    #[must_use]
    pub fn has_user_data(&self) -> bool {
        keys::ALL.iter().any(|key| self.contains(key))
    }

    /// Returns a copy without user data, keeping migration markers.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| key.starts_with(keys::MIGRATED_PREFIX))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Iterates over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrefValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds the user record, defaulting every missing key.
    ///
    /// A missing or unknown profession reads as [`Profession::Other`].
    #[must_use]
    pub fn to_user(&self) -> UserRecord {
        UserRecord {
            name: self.get_str(keys::NAME).unwrap_or_default().to_string(),
            email: self.get_str(keys::EMAIL).unwrap_or_default().to_string(),
            code: self.get_int(keys::CODE).unwrap_or_default(),
            profession: self
                .get_str(keys::PROFESSION)
                .and_then(Profession::parse)
                .unwrap_or_default(),
        }
    }

    /// Writes every field set in `patch`. Returns the keys that changed.
    pub fn apply_patch(&mut self, patch: &UserPatch) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = &patch.name
            && self.set(keys::NAME, PrefValue::Str(name.clone()))
        {
            changed.push(keys::NAME);
        }
        if let Some(email) = &patch.email
            && self.set(keys::EMAIL, PrefValue::Str(email.clone()))
        {
            changed.push(keys::EMAIL);
        }
        if let Some(code) = patch.code
            && self.set(keys::CODE, PrefValue::Int(code))
        {
            changed.push(keys::CODE);
        }
        if let Some(profession) = patch.profession
            && self.set(
                keys::PROFESSION,
                PrefValue::Str(profession.as_str().to_string()),
            )
        {
            changed.push(keys::PROFESSION);
        }
        changed
    }
}

impl From<&UserRecord> for Preferences {
    fn from(user: &UserRecord) -> Self {
        let mut prefs = Self::new();
        prefs.apply_patch(&UserPatch::from(user));
        prefs
    }
}
