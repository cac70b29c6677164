//! Business logic services.
//!
//! [`UserRepository`] routes every user operation to the selected backend;
//! [`forms`] turns raw form input into records and patches.

pub mod forms;
mod repository;

pub use forms::{EditUserForm, NewUserForm, profession_names, valid_users};
pub use repository::{UserRepository, UsersStream};
