//! Data models for userstore.
//!
//! This module contains the user record, its partial update, and the backend
//! selector shared by every storage backend.

mod method;
mod user;

pub use method::Method;
pub use user::{Profession, UserPatch, UserRecord};
