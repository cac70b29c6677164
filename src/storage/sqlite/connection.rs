//! Connection setup for the `SQLite` backend.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Opens (creating if needed) the database at `path` and configures it.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the parent directory cannot be
/// created or the database cannot be opened.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_db_dir", e))?;
    }
    let conn = Connection::open(path).map_err(|e| Error::operation("open_sqlite", e))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Opens a private in-memory database.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if `SQLite` cannot allocate it.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::operation("open_sqlite_in_memory", e))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Applies the pragmas every connection uses.
///
/// - **WAL mode** lets readers proceed while a write is in progress
/// - **NORMAL synchronous** is durable enough with WAL
/// - **`busy_timeout`** waits up to 5 seconds on a locked database
///
/// Pragma failures are ignored: in-memory databases refuse WAL, and
/// `journal_mode` returns a row that `execute` would reject.
///
/// # Errors
///
/// Currently infallible; the `Result` leaves room for required pragmas.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
    Ok(())
}

/// Runs `body` inside `BEGIN IMMEDIATE` / `COMMIT`, rolling back on error.
///
/// # Errors
///
/// Returns the error from `body`, or [`Error::OperationFailed`] if the
/// transaction cannot be started or committed.
pub fn in_transaction<R>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> Result<R>,
) -> Result<R> {
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| Error::operation("begin_transaction", e))?;

    match body(conn) {
        Ok(value) => {
            conn.execute("COMMIT", [])
                .map_err(|e| Error::operation("commit_transaction", e))?;
            Ok(value)
        },
        Err(e) => {
            let _ = conn.execute("ROLLBACK", []);
            Err(e)
        },
    }
}
