//! User repository: one entry point over every backend.

use crate::config::StoreConfig;
use crate::models::{Method, UserPatch, UserRecord};
use crate::storage::traits::{ListRecordStore, RecordStore, RecordStream};
use crate::storage::preferences::EXTRA_LEGACY_PREFS_FILE;
use crate::storage::{LegacyPrefsStore, PreferencesStore, UserListStore, UserRecordStore, UserTable};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::StreamExt;
use tracing::instrument;

/// Stream of user lists, whatever the backend's native shape.
pub type UsersStream = RecordStream<Vec<UserRecord>>;

/// A backend, by the shape of what it stores.
enum Backend<'a> {
    Single(&'a dyn RecordStore<State = UserRecord>),
    List(&'a dyn ListRecordStore),
}

/// Reads and writes users through the currently selected backend.
///
/// Every backend is opened up front; [`set_method`](Self::set_method) only
/// changes which one later calls go to. Data is not copied between backends,
/// and streams obtained from [`observe_users`](Self::observe_users) keep
/// following the backend that was selected when they were created.
///
/// Single-record backends are presented as a list of exactly one user.
pub struct UserRepository {
    legacy: Arc<LegacyPrefsStore>,
    preferences: PreferencesStore,
    record: UserRecordStore,
    list: UserListStore,
    table: UserTable,
    method: Method,
}

impl UserRepository {
    /// Opens every backend under `config.data_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the database cannot be created.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let dir = &config.data_dir;
        std::fs::create_dir_all(dir).map_err(|e| Error::operation("create_data_dir", e))?;

        let legacy = Arc::new(LegacyPrefsStore::in_dir(dir));
        let extra_legacy = Arc::new(LegacyPrefsStore::new(dir.join(EXTRA_LEGACY_PREFS_FILE)));
        let repository = Self {
            preferences: PreferencesStore::in_dir(dir, Arc::clone(&legacy))
                .with_legacy_source(extra_legacy),
            record: UserRecordStore::in_dir(dir, Arc::clone(&legacy)),
            list: UserListStore::in_dir(dir),
            table: UserTable::in_dir(dir)?,
            legacy,
            method: config.default_method,
        };
        tracing::info!(
            data_dir = %dir.display(),
            method = %repository.method,
            "Opened user repository"
        );
        Ok(repository)
    }

    /// Returns the selected backend.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Selects the backend for subsequent calls.
    pub fn set_method(&mut self, method: Method) {
        if method != self.method {
            tracing::info!(from = %self.method, to = %method, "Switching storage method");
            self.method = method;
        }
    }

    /// The legacy flat store, e.g. to listen for key changes.
    #[must_use]
    pub fn legacy(&self) -> &LegacyPrefsStore {
        &self.legacy
    }

    /// The preferences store.
    #[must_use]
    pub const fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    /// The single-record store.
    #[must_use]
    pub const fn record(&self) -> &UserRecordStore {
        &self.record
    }

    /// The list store.
    #[must_use]
    pub const fn list(&self) -> &UserListStore {
        &self.list
    }

    /// The `SQLite` table.
    #[must_use]
    pub const fn table(&self) -> &UserTable {
        &self.table
    }

    /// The selected backend.
    fn backend(&self) -> Backend<'_> {
        match self.method {
            Method::LegacyPrefs => Backend::Single(self.legacy.as_ref()),
            Method::Preferences => Backend::Single(&self.preferences),
            Method::Record => Backend::Single(&self.record),
            Method::RecordList => Backend::List(&self.list),
            Method::Table => Backend::List(&self.table),
        }
    }

    /// Runs `single` or `list` depending on the selected backend's shape.
    fn dispatch<R>(
        &self,
        single: impl FnOnce(&dyn RecordStore<State = UserRecord>) -> Result<R>,
        list: impl FnOnce(&dyn ListRecordStore) -> Result<R>,
    ) -> Result<R> {
        match self.backend() {
            Backend::Single(store) => single(store),
            Backend::List(store) => list(store),
        }
    }

    /// Logs the outcome and records metrics for one operation.
    fn measured<R>(&self, operation: &'static str, body: impl FnOnce() -> Result<R>) -> Result<R> {
        let backend = self.method.as_str();
        let start = Instant::now();
        let result = body();

        let status = match &result {
            Ok(_) => {
                tracing::debug!(backend, operation, "User operation succeeded");
                "success"
            },
            Err(e) => {
                tracing::warn!(backend, operation, error = %e, "User operation failed");
                "error"
            },
        };
        metrics::counter!(
            "user_repository_operations_total",
            "backend" => backend,
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "user_repository_operation_duration_ms",
            "backend" => backend,
            "operation" => operation
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    /// Subscribes to the users of the selected backend.
    ///
    /// The stream yields the current users first, then the users after every
    /// change, and keeps following this backend after a method switch.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn observe_users(&self) -> Result<UsersStream> {
        self.measured("observe_users", || {
            self.dispatch(
                |store| {
                    let stream: UsersStream = Box::pin(store.observe()?.map(|user| vec![user]));
                    Ok(stream)
                },
                |store| store.observe(),
            )
        })
    }

    /// Reads the users of the selected backend.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn read_users(&self) -> Result<Vec<UserRecord>> {
        self.measured("read_users", || {
            self.dispatch(|store| Ok(vec![store.read()?]), |store| store.read())
        })
    }

    /// Reads one user.
    ///
    /// List backends return the user with `code`, else the first user, and
    /// `None` only when empty. Single-record backends ignore `code`.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn read_user(&self, code: Option<i32>) -> Result<Option<UserRecord>> {
        self.measured("read_user", || {
            self.dispatch(|store| Ok(Some(store.read()?)), |store| store.find(code))
        })
    }

    /// Adds a user. Single-record backends overwrite their record.
    #[instrument(skip(self, user), fields(method = %self.method, code = user.code))]
    pub fn add_user(&self, user: &UserRecord) -> Result<()> {
        self.measured("add_user", || {
            self.dispatch(
                |store| store.write(&UserPatch::from(user)),
                |store| store.add(user),
            )
        })
    }

    /// Applies `patch` to one user.
    ///
    /// On list backends the target is resolved like [`read_user`](Self::read_user)
    /// and keeps its code; an empty list fails with [`Error::NotFound`].
    #[instrument(skip(self, patch), fields(method = %self.method))]
    pub fn edit_user(&self, code: Option<i32>, patch: &UserPatch) -> Result<()> {
        self.measured("edit_user", || {
            self.dispatch(
                |store| store.write(patch),
                |store| {
                    let target = store
                        .find(code)?
                        .ok_or_else(|| Error::NotFound(code.unwrap_or_default()))?;
                    let mut updated = target.patched(patch);
                    updated.code = target.code;
                    store.replace(&updated)
                },
            )
        })
    }

    /// Removes the user with `code`. Returns false if there was none.
    ///
    /// Single-record backends cannot remove one user, so they are cleared.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn remove_user(&self, code: i32) -> Result<bool> {
        self.measured("remove_user", || {
            self.dispatch(
                |store| {
                    tracing::debug!(code, "Backend holds one record, clearing it");
                    store.clear()?;
                    Ok(true)
                },
                |store| store.remove(code),
            )
        })
    }

    /// Resets the selected backend to its empty state.
    #[instrument(skip(self), fields(method = %self.method))]
    pub fn clear(&self) -> Result<()> {
        self.measured("clear", || self.dispatch(|store| store.clear(), |store| store.clear()))
    }
}
