//! Storage backends.
//!
//! Five interchangeable backends behind [`RecordStore`]:
//! - **Flat key-value**: [`LegacyPrefsStore`], the legacy layout
//! - **Preferences**: [`PreferencesStore`], seeded from the legacy layout
//! - **Single record**: [`UserRecordStore`], seeded from the legacy layout
//! - **Record list**: [`UserListStore`]
//! - **Table**: [`UserTable`] on `SQLite`
//!
//! The file-based backends share [`datastore::DataStore`] for loading,
//! migration, atomic writes, and change notification.

// Lock guards span the whole critical section.
#![allow(clippy::significant_drop_tightening)]

pub mod datastore;
mod lock;
pub mod preferences;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use lock::acquire_lock;
pub use preferences::{KeyChange, KeyListener, LegacyPrefsStore, PreferencesStore};
pub use record::{UserListStore, UserRecordStore};
pub use sqlite::UserTable;
pub use traits::{ListRecordStore, RecordStore, RecordStream};
