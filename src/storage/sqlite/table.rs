//! `SQLite` user table backend.

use super::connection::{in_transaction, open_connection, open_in_memory};
use crate::models::{Profession, UserPatch, UserRecord};
use crate::observability::{record_operation_metrics, status_label};
use crate::storage::acquire_lock;
use crate::storage::traits::{ListRecordStore, RecordStore, RecordStream, watch_stream};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::watch;
use tracing::instrument;

/// File name of the database inside the data directory.
pub const USER_TABLE_FILE: &str = "user_database.db";

const BACKEND: &str = "table";

const SELECT_USERS: &str =
    "SELECT code, name, email, profession FROM user_table ORDER BY name ASC, code ASC";

/// Users stored as rows of `user_table`, keyed by code.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>`, so statements from this process run one at a
/// time. Each mutation is its own `BEGIN IMMEDIATE` transaction, after which
/// the full row set is reloaded and published to observers.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_table (
///     code INTEGER PRIMARY KEY,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     profession TEXT NOT NULL
/// )
/// ```
pub struct UserTable {
    /// Connection to the database.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
    /// Row set as of the last reload, ordered by name.
    sender: watch::Sender<Vec<UserRecord>>,
}

impl UserTable {
    /// Opens the table in the database at `db_path`, creating both if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path)?;
        Self::with_connection(conn, Some(db_path))
    }

    /// Opens the table under `dir` using the standard file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::open(dir.join(USER_TABLE_FILE))
    }

    /// Creates a table in a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_table (
                code INTEGER PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                profession TEXT NOT NULL DEFAULT 'OTHER'
            )",
            [],
        )
        .map_err(|e| Error::operation("create_user_table", e))?;

        let users = select_users(&conn)?;
        let (sender, _receiver) = watch::channel(users);
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            sender,
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Inserts `user`, or replaces the row with the same code.
    #[instrument(skip(self, user), fields(operation = "upsert", backend = BACKEND, code = user.code))]
    pub fn upsert(&self, user: &UserRecord) -> Result<()> {
        self.mutate("upsert", |conn| {
            insert_user(conn, user, "INSERT OR REPLACE")?;
            Ok(())
        })
    }

    /// Runs `body` in a transaction, then reloads and publishes the rows.
    fn mutate<R>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            let result = in_transaction(&conn, body);
            if result.is_ok() {
                // Failures are logged by reload
                let _ = self.reload(&conn);
            }
            result
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }

    /// Reads every row and publishes it.
    ///
    /// A failed read publishes no rows and returns the error.
    fn reload(&self, conn: &Connection) -> Result<Vec<UserRecord>> {
        let loaded = select_users(conn);
        let users = match &loaded {
            Ok(users) => users.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload user table, serving no rows");
                metrics::counter!("storage_read_failures_absorbed_total").increment(1);
                Vec::new()
            },
        };
        self.sender.send_if_modified(|current| {
            if *current == users {
                false
            } else {
                *current = users;
                true
            }
        });
        loaded
    }
}

fn select_users(conn: &Connection) -> Result<Vec<UserRecord>> {
    let mut stmt = conn
        .prepare(SELECT_USERS)
        .map_err(|e| Error::operation("prepare_select_users", e))?;
    let rows = stmt
        .query_map([], row_to_user)
        .map_err(|e| Error::operation("select_users", e))?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::operation("read_user_row", e))
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let profession: String = row.get(3)?;
    Ok(UserRecord {
        code: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        profession: Profession::parse(&profession).unwrap_or_default(),
    })
}

fn select_user(conn: &Connection, code: i32) -> Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT code, name, email, profession FROM user_table WHERE code = ?1",
        params![code],
        row_to_user,
    )
    .optional()
    .map_err(|e| Error::operation("select_user", e))
}

/// Inserts `user` with the given verb (`INSERT OR IGNORE`, `INSERT OR REPLACE`).
fn insert_user(conn: &Connection, user: &UserRecord, verb: &str) -> Result<usize> {
    conn.execute(
        &format!(
            "{verb} INTO user_table (code, name, email, profession) VALUES (?1, ?2, ?3, ?4)"
        ),
        params![user.code, user.name, user.email, user.profession.as_str()],
    )
    .map_err(|e| Error::operation("insert_user", e))
}

impl RecordStore for UserTable {
    type State = Vec<UserRecord>;

    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn observe(&self) -> Result<RecordStream<Vec<UserRecord>>> {
        Ok(watch_stream(self.sender.subscribe(), |users| users))
    }

    #[instrument(skip(self), fields(operation = "read", backend = BACKEND))]
    fn read(&self) -> Result<Vec<UserRecord>> {
        let start = Instant::now();
        let loaded = {
            let conn = acquire_lock(&self.conn);
            self.reload(&conn)
        };
        record_operation_metrics(BACKEND, "read", start, status_label(&loaded));
        Ok(loaded.unwrap_or_default())
    }

    #[instrument(skip(self, patch), fields(operation = "write", backend = BACKEND))]
    fn write(&self, patch: &UserPatch) -> Result<()> {
        let code = patch.code.ok_or_else(|| {
            Error::InvalidInput("table update needs the code of the target user".to_string())
        })?;
        self.mutate("write", |conn| {
            let current = select_user(conn, code)?.ok_or(Error::NotFound(code))?;
            insert_user(conn, &current.patched(patch), "INSERT OR REPLACE")?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "clear", backend = BACKEND))]
    fn clear(&self) -> Result<()> {
        self.mutate("clear", |conn| {
            conn.execute("DELETE FROM user_table", [])
                .map_err(|e| Error::operation("delete_all_users", e))?;
            Ok(())
        })
    }
}

impl ListRecordStore for UserTable {
    /// Inserts `user`. A row with the same code is left untouched.
    #[instrument(skip(self, user), fields(operation = "add", backend = BACKEND, code = user.code))]
    fn add(&self, user: &UserRecord) -> Result<()> {
        self.mutate("add", |conn| {
            if insert_user(conn, user, "INSERT OR IGNORE")? == 0 {
                tracing::debug!(code = user.code, "Code already present, insert ignored");
            }
            Ok(())
        })
    }

    #[instrument(skip(self, user), fields(operation = "replace", backend = BACKEND, code = user.code))]
    fn replace(&self, user: &UserRecord) -> Result<()> {
        self.mutate("replace", |conn| {
            if select_user(conn, user.code)?.is_none() {
                return Err(Error::NotFound(user.code));
            }
            insert_user(conn, user, "INSERT OR REPLACE")?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "remove", backend = BACKEND))]
    fn remove(&self, code: i32) -> Result<bool> {
        self.mutate("remove", |conn| {
            let deleted = conn
                .execute("DELETE FROM user_table WHERE code = ?1", params![code])
                .map_err(|e| Error::operation("delete_user", e))?;
            Ok(deleted > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    fn user(name: &str, code: i32) -> UserRecord {
        UserRecord::new(name, format!("{name}@example.com"), code, Profession::Gamer)
    }

    #[test]
    fn test_rows_are_ordered_by_name() {
        let table = UserTable::in_memory().unwrap();
        table.add(&user("Caio", 1)).unwrap();
        table.add(&user("Ana", 2)).unwrap();
        table.add(&user("Bia", 3)).unwrap();

        let names: Vec<_> = table.read().unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Ana", "Bia", "Caio"]);
    }

    #[test]
    fn test_add_ignores_duplicate_code() {
        let table = UserTable::in_memory().unwrap();
        table.add(&user("Ana", 1)).unwrap();
        table.add(&user("Other", 1)).unwrap();

        assert_eq!(table.read().unwrap(), vec![user("Ana", 1)]);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let table = UserTable::in_memory().unwrap();
        table.upsert(&user("Ana", 1)).unwrap();
        table.upsert(&user("Ana Maria", 1)).unwrap();

        assert_eq!(table.read().unwrap(), vec![user("Ana Maria", 1)]);
    }

    #[test]
    fn test_replace_unknown_code_fails() {
        let table = UserTable::in_memory().unwrap();
        assert!(matches!(table.replace(&user("Ana", 4)), Err(Error::NotFound(4))));
        assert!(table.read().unwrap().is_empty());
    }

    #[test]
    fn test_write_patches_row() {
        let table = UserTable::in_memory().unwrap();
        table.add(&user("Ana", 1)).unwrap();

        table
            .write(&UserPatch::new().code(1).profession(Profession::Coach))
            .unwrap();
        let stored = table.find(Some(1)).unwrap().unwrap();
        assert_eq!(stored.profession, Profession::Coach);
        assert_eq!(stored.email, "Ana@example.com");

        assert!(matches!(
            table.write(&UserPatch::new().name("x")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let table = UserTable::in_memory().unwrap();
        table.add(&user("Ana", 1)).unwrap();
        table.add(&user("Bia", 2)).unwrap();

        assert!(table.remove(1).unwrap());
        assert!(!table.remove(1).unwrap());
        assert_eq!(table.read().unwrap(), vec![user("Bia", 2)]);

        table.clear().unwrap();
        assert!(table.read().unwrap().is_empty());
    }

    #[test]
    fn test_rows_persist_in_file() {
        let dir = TempDir::new().unwrap();
        UserTable::in_dir(dir.path()).unwrap().add(&user("Ana", 1)).unwrap();

        let reopened = UserTable::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.read().unwrap(), vec![user("Ana", 1)]);
        assert_eq!(
            reopened.db_path(),
            Some(&dir.path().join(USER_TABLE_FILE))
        );
    }

    #[test]
    fn test_failed_read_serves_no_rows() {
        let table = UserTable::in_memory().unwrap();
        table.add(&user("Ana", 1)).unwrap();
        acquire_lock(&table.conn)
            .execute("DROP TABLE user_table", [])
            .unwrap();

        assert!(table.reload(&acquire_lock(&table.conn)).is_err());
        assert!(table.read().unwrap().is_empty());
        assert!(table.sender.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_observers_see_reloads() {
        let table = UserTable::in_memory().unwrap();
        let mut stream = table.observe().unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        table.add(&user("Ana", 1)).unwrap();
        assert_eq!(stream.next().await.unwrap(), vec![user("Ana", 1)]);
    }
}
