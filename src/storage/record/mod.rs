//! Structured record backends.
//!
//! Users are stored as whole JSON objects rather than separate keys:
//! [`UserRecordStore`] holds one user, [`UserListStore`] an ordered list.

mod list;
mod single;
mod stored;

pub use list::{USER_LIST_FILE, UserListStore};
pub use single::{LegacyProfileMigration, USER_RECORD_FILE, UserRecordStore};
pub use stored::{StoredProfession, StoredProfile, StoredUser, StoredUsers};
