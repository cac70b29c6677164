//! Key-value preferences store migrated from the legacy layout.

use super::{LegacyPrefsStore, PrefValue, Preferences, keys};
use crate::models::{Profession, UserPatch, UserRecord};
use crate::storage::datastore::{DataMigration, DataStore, JsonCodec};
use crate::storage::traits::{RecordStore, RecordStream, watch_distinct, watch_stream};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// File name of the preferences store inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences_data_store.json";

/// Copies keys from a legacy store that the preferences file lacks.
///
/// Keys already present are left alone. Once it has run, a marker key named
/// after the source file is stored, and the source is not read again, even
/// after the user keys are cleared.
pub struct LegacyPrefsMigration {
    legacy: Arc<LegacyPrefsStore>,
    marker: String,
}

impl LegacyPrefsMigration {
    /// Creates the migration reading from `legacy`.
    #[must_use]
    pub fn new(legacy: Arc<LegacyPrefsStore>) -> Self {
        let source = legacy
            .path()
            .file_name()
            .map_or_else(|| "legacy".into(), |name| name.to_string_lossy().into_owned());
        Self {
            marker: format!("{}{source}", keys::MIGRATED_PREFIX),
            legacy,
        }
    }

    /// Key recording that this source was migrated.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl DataMigration<Preferences> for LegacyPrefsMigration {
    fn description(&self) -> &'static str {
        "copy legacy preference keys"
    }

    fn should_migrate(&self, current: &Preferences) -> Result<bool> {
        if current.contains(&self.marker) {
            return Ok(false);
        }
        let legacy = self.legacy.snapshot()?;
        Ok(legacy.iter().any(|(key, _)| !current.contains(key)))
    }

    fn migrate(&self, mut current: Preferences) -> Result<Preferences> {
        let legacy = self.legacy.snapshot()?;
        for (key, value) in legacy.iter() {
            if !current.contains(key) {
                current.set(key, value.clone());
            }
        }
        current.set(&self.marker, PrefValue::Int(1));
        Ok(current)
    }
}

/// User record stored as separate keys, seeded from legacy stores.
pub struct PreferencesStore {
    data: DataStore<Preferences>,
}

impl PreferencesStore {
    /// Creates a store backed by `path`, migrating from `legacy` on first load.
    pub fn new(path: impl Into<PathBuf>, legacy: Arc<LegacyPrefsStore>) -> Self {
        Self {
            data: DataStore::new(path, JsonCodec)
                .with_migration(LegacyPrefsMigration::new(legacy)),
        }
    }

    /// Creates a store under `dir` using the standard file name.
    pub fn in_dir(dir: &Path, legacy: Arc<LegacyPrefsStore>) -> Self {
        Self::new(dir.join(PREFERENCES_FILE), legacy)
    }

    /// Adds another legacy source, migrated after the ones already added.
    ///
    /// A key found in several sources keeps the value of the first.
    #[must_use]
    pub fn with_legacy_source(mut self, legacy: Arc<LegacyPrefsStore>) -> Self {
        self.data = self.data.with_migration(LegacyPrefsMigration::new(legacy));
        self
    }

    /// Reads the user.
    pub fn read_user(&self) -> Result<UserRecord> {
        Ok(self.data.current()?.to_user())
    }

    /// Reads the name (empty if unset).
    pub fn name(&self) -> Result<String> {
        Ok(self.read_user()?.name)
    }

    /// Reads the contact address (empty if unset).
    pub fn email(&self) -> Result<String> {
        Ok(self.read_user()?.email)
    }

    /// Reads the code (zero if unset).
    pub fn code(&self) -> Result<i32> {
        Ok(self.read_user()?.code)
    }

    /// Reads the profession ([`Profession::Other`] if unset).
    pub fn profession(&self) -> Result<Profession> {
        Ok(self.read_user()?.profession)
    }

    /// Streams the name, firing only when it changes.
    pub fn observe_name(&self) -> Result<RecordStream<String>> {
        Ok(watch_distinct(self.data.subscribe()?, |prefs| prefs.to_user().name))
    }

    /// Streams the contact address, firing only when it changes.
    pub fn observe_email(&self) -> Result<RecordStream<String>> {
        Ok(watch_distinct(self.data.subscribe()?, |prefs| prefs.to_user().email))
    }

    /// Streams the code, firing only when it changes.
    pub fn observe_code(&self) -> Result<RecordStream<i32>> {
        Ok(watch_distinct(self.data.subscribe()?, |prefs| prefs.to_user().code))
    }

    /// Streams the profession, firing only when it changes.
    pub fn observe_profession(&self) -> Result<RecordStream<Profession>> {
        Ok(watch_distinct(self.data.subscribe()?, |prefs| {
            prefs.to_user().profession
        }))
    }

    /// Returns true if any user key is stored.
    pub fn has_data(&self) -> Result<bool> {
        Ok(self.data.current()?.has_user_data())
    }
}

impl RecordStore for PreferencesStore {
    type State = UserRecord;

    fn backend(&self) -> &'static str {
        "preferences"
    }

    fn observe(&self) -> Result<RecordStream<UserRecord>> {
        Ok(watch_stream(self.data.subscribe()?, |prefs| prefs.to_user()))
    }

    fn read(&self) -> Result<UserRecord> {
        self.read_user()
    }

    #[instrument(skip(self, patch), fields(backend = "preferences", operation = "write"))]
    fn write(&self, patch: &UserPatch) -> Result<()> {
        self.data.update_data(|prefs| {
            let mut next = prefs.clone();
            next.apply_patch(patch);
            Ok(next)
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "preferences", operation = "clear"))]
    fn clear(&self) -> Result<()> {
        self.data.update_data(|prefs| Ok(prefs.cleared()))?;
        Ok(())
    }
}
