//! `SQLite` backend.

mod connection;
mod table;

pub use connection::{configure_connection, in_transaction, open_connection, open_in_memory};
pub use table::{USER_TABLE_FILE, UserTable};
