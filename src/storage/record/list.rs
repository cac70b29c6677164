//! Structured list-of-records store.

use super::stored::{StoredUser, StoredUsers};
use crate::models::{UserPatch, UserRecord};
use crate::storage::datastore::{DataStore, JsonCodec};
use crate::storage::traits::{ListRecordStore, RecordStore, RecordStream, watch_stream};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// File name of the list store inside the data directory.
pub const USER_LIST_FILE: &str = "users_preferences.json";

/// An ordered list of users stored as one object.
///
/// Every mutation replaces the whole list atomically. Codes are not required
/// to be unique; lookups act on the first match.
pub struct UserListStore {
    data: DataStore<StoredUsers>,
}

impl UserListStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            data: DataStore::new(path, JsonCodec),
        }
    }

    /// Creates a store under `dir` using the standard file name.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(USER_LIST_FILE))
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data.path()
    }
}

impl RecordStore for UserListStore {
    type State = Vec<UserRecord>;

    fn backend(&self) -> &'static str {
        "record-list"
    }

    fn observe(&self) -> Result<RecordStream<Vec<UserRecord>>> {
        Ok(watch_stream(self.data.subscribe()?, |stored| stored.to_records()))
    }

    fn read(&self) -> Result<Vec<UserRecord>> {
        Ok(self.data.current()?.to_records())
    }

    #[instrument(skip(self, patch), fields(backend = "record-list", operation = "write"))]
    fn write(&self, patch: &UserPatch) -> Result<()> {
        let code = patch.code.ok_or_else(|| {
            Error::InvalidInput("list update needs the code of the target user".to_string())
        })?;
        self.data.update_data(|stored| {
            let index = stored.position(code).ok_or(Error::NotFound(code))?;
            let mut next = stored.clone();
            next.users[index] = StoredUser::from(&stored.users[index].to_record().patched(patch));
            Ok(next)
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "record-list", operation = "clear"))]
    fn clear(&self) -> Result<()> {
        self.data.update_data(|_| Ok(StoredUsers::default()))?;
        Ok(())
    }
}

impl ListRecordStore for UserListStore {
    #[instrument(skip(self, user), fields(backend = "record-list", operation = "add", code = user.code))]
    fn add(&self, user: &UserRecord) -> Result<()> {
        self.data.update_data(|stored| {
            let mut next = stored.clone();
            next.users.push(StoredUser::from(user));
            Ok(next)
        })?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(backend = "record-list", operation = "replace", code = user.code))]
    fn replace(&self, user: &UserRecord) -> Result<()> {
        self.data.update_data(|stored| {
            let index = stored.position(user.code).ok_or(Error::NotFound(user.code))?;
            let mut next = stored.clone();
            next.users[index] = StoredUser::from(user);
            Ok(next)
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "record-list", operation = "remove"))]
    fn remove(&self, code: i32) -> Result<bool> {
        let mut removed = false;
        self.data.update_data(|stored| {
            let mut next = stored.clone();
            if let Some(index) = stored.position(code) {
                next.users.remove(index);
                removed = true;
            }
            Ok(next)
        })?;
        Ok(removed)
    }
}
