//! Structured single-record store.

use super::stored::{StoredProfession, StoredProfile, StoredUser};
use crate::models::{UserPatch, UserRecord};
use crate::storage::datastore::{DataMigration, DataStore, JsonCodec};
use crate::storage::preferences::LegacyPrefsStore;
use crate::storage::traits::{RecordStore, RecordStream, watch_stream};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// File name of the single-record store inside the data directory.
pub const USER_RECORD_FILE: &str = "user_preferences.json";

/// Fills an empty record from the legacy flat store.
///
/// Applies while the stored profession is unspecified, which is the state of
/// a record that was never written, unless the file is already marked as
/// migrated. Every field is taken from the legacy store; a missing
/// profession there becomes [`Profession::Other`]. The marker survives
/// [`clear`](RecordStore::clear), so a cleared record stays empty.
///
/// [`Profession::Other`]: crate::models::Profession::Other
pub struct LegacyProfileMigration {
    legacy: Arc<LegacyPrefsStore>,
}

impl LegacyProfileMigration {
    /// Creates the migration reading from `legacy`.
    #[must_use]
    pub const fn new(legacy: Arc<LegacyPrefsStore>) -> Self {
        Self { legacy }
    }
}

impl DataMigration<StoredProfile> for LegacyProfileMigration {
    fn description(&self) -> &'static str {
        "copy legacy user profile"
    }

    fn should_migrate(&self, current: &StoredProfile) -> Result<bool> {
        Ok(!current.legacy_migrated && current.user.profession == StoredProfession::Unspecified)
    }

    fn migrate(&self, _current: StoredProfile) -> Result<StoredProfile> {
        let user = self.legacy.snapshot()?.to_user();
        Ok(StoredProfile {
            user: StoredUser::from(&user),
            legacy_migrated: true,
        })
    }
}

/// One user stored as a whole object.
pub struct UserRecordStore {
    data: DataStore<StoredProfile>,
}

impl UserRecordStore {
    /// Creates a store backed by `path`, migrating from `legacy` on first load.
    pub fn new(path: impl Into<PathBuf>, legacy: Arc<LegacyPrefsStore>) -> Self {
        Self {
            data: DataStore::new(path, JsonCodec)
                .with_migration(LegacyProfileMigration::new(legacy)),
        }
    }

    /// Creates a store under `dir` using the standard file name.
    pub fn in_dir(dir: &Path, legacy: Arc<LegacyPrefsStore>) -> Self {
        Self::new(dir.join(USER_RECORD_FILE), legacy)
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data.path()
    }
}

impl RecordStore for UserRecordStore {
    type State = UserRecord;

    fn backend(&self) -> &'static str {
        "record"
    }

    fn observe(&self) -> Result<RecordStream<UserRecord>> {
        Ok(watch_stream(self.data.subscribe()?, |stored| stored.user.to_record()))
    }

    fn read(&self) -> Result<UserRecord> {
        Ok(self.data.current()?.user.to_record())
    }

    #[instrument(skip(self, patch), fields(backend = "record", operation = "write"))]
    fn write(&self, patch: &UserPatch) -> Result<()> {
        self.data.update_data(|stored| {
            Ok(StoredProfile {
                user: StoredUser::from(&stored.user.to_record().patched(patch)),
                legacy_migrated: stored.legacy_migrated,
            })
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "record", operation = "clear"))]
    fn clear(&self) -> Result<()> {
        self.data.update_data(|stored| {
            Ok(StoredProfile {
                user: StoredUser::default(),
                legacy_migrated: stored.legacy_migrated,
            })
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profession;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> (Arc<LegacyPrefsStore>, UserRecordStore) {
        let legacy = Arc::new(LegacyPrefsStore::in_dir(dir.path()));
        let store = UserRecordStore::in_dir(dir.path(), Arc::clone(&legacy));
        (legacy, store)
    }

    #[test]
    fn test_empty_store_reads_default() {
        let dir = TempDir::new().unwrap();
        let (_, store) = open(&dir);
        assert_eq!(store.read().unwrap(), UserRecord::default());
    }

    #[test]
    fn test_migrates_from_legacy_on_first_read() {
        let dir = TempDir::new().unwrap();
        {
            let legacy = LegacyPrefsStore::in_dir(dir.path());
            legacy.put_name("Ana").unwrap();
            legacy.put_code(7).unwrap();
            legacy.put_profession(Profession::Engineer).unwrap();
        }

        let (_, store) = open(&dir);
        assert_eq!(
            store.read().unwrap(),
            UserRecord::new("Ana", "", 7, Profession::Engineer)
        );
        assert!(store.path().exists());
    }

    #[test]
    fn test_missing_legacy_profession_becomes_other() {
        let dir = TempDir::new().unwrap();
        let (legacy, _) = open(&dir);
        legacy.put_name("Bia").unwrap();

        let stored = LegacyProfileMigration::new(legacy)
            .migrate(StoredProfile::default())
            .unwrap();
        assert_eq!(stored.user.name, "Bia");
        assert_eq!(stored.user.profession, StoredProfession::Other);
        assert!(stored.legacy_migrated);
    }

    #[test]
    fn test_set_profession_skips_migration() {
        let dir = TempDir::new().unwrap();
        let (legacy, _) = open(&dir);
        let migration = LegacyProfileMigration::new(legacy);

        let stored = StoredProfile {
            user: StoredUser {
                profession: StoredProfession::Coach,
                ..StoredUser::default()
            },
            legacy_migrated: false,
        };
        assert!(!migration.should_migrate(&stored).unwrap());
        assert!(migration.should_migrate(&StoredProfile::default()).unwrap());

        let cleared = StoredProfile {
            legacy_migrated: true,
            ..StoredProfile::default()
        };
        assert!(!migration.should_migrate(&cleared).unwrap());
    }

    #[test]
    fn test_partial_write_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let (_, store) = open(&dir);
        store
            .write(&UserPatch::from(&UserRecord::new("Ana", "a@b.c", 3, Profession::Gamer)))
            .unwrap();

        store.write(&UserPatch::new().email("new@b.c")).unwrap();
        assert_eq!(
            store.read().unwrap(),
            UserRecord::new("Ana", "new@b.c", 3, Profession::Gamer)
        );
    }

    #[test]
    fn test_clear_resets_to_default() {
        let dir = TempDir::new().unwrap();
        let (_, store) = open(&dir);
        store.write(&UserPatch::new().name("Ana").code(1)).unwrap();

        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), UserRecord::default());
    }

    #[test]
    fn test_clear_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let legacy = LegacyPrefsStore::in_dir(dir.path());
            legacy.put_name("Ana").unwrap();
            legacy.put_code(7).unwrap();
            legacy.put_profession(Profession::Engineer).unwrap();
        }
        {
            let (_, store) = open(&dir);
            assert_eq!(store.read().unwrap().name, "Ana");
            store.clear().unwrap();
        }

        let (_, store) = open(&dir);
        assert_eq!(store.read().unwrap(), UserRecord::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(USER_RECORD_FILE), b"[not an object").unwrap();
        let (_, store) = open(&dir);

        assert!(matches!(store.read(), Err(crate::Error::Corruption { .. })));
    }
}
