//! Record store traits.

use crate::Result;
use crate::models::{UserPatch, UserRecord};
use std::pin::Pin;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

/// A push sequence of store states.
///
/// Yields the value current at subscription time first, then the value after
/// every change. It never ends while the store is alive; drop it to
/// unsubscribe.
pub type RecordStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Builds a [`RecordStream`] from a watch receiver, mapping each value.
pub fn watch_stream<S, T, F>(receiver: watch::Receiver<S>, map: F) -> RecordStream<T>
where
    S: Clone + Send + Sync + 'static,
    T: 'static,
    F: FnMut(S) -> T + Send + 'static,
{
    Box::pin(WatchStream::new(receiver).map(map))
}

/// Like [`watch_stream`], but skips values equal to the last one yielded.
///
/// Used for single-field streams, which should not fire when some other
/// field of the store changes.
pub fn watch_distinct<S, T, F>(receiver: watch::Receiver<S>, mut map: F) -> RecordStream<T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + 'static,
    F: FnMut(S) -> T + Send + 'static,
{
    let mut last: Option<T> = None;
    Box::pin(WatchStream::new(receiver).filter_map(move |state| {
        let value = map(state);
        if last.as_ref() == Some(&value) {
            return None;
        }
        last = Some(value.clone());
        Some(value)
    }))
}

/// Returns the first user with `code`, or the first user if none matches.
///
/// `None` only when `users` is empty.
pub fn find_user(users: &[UserRecord], code: Option<i32>) -> Option<UserRecord> {
    code.and_then(|code| users.iter().find(|user| user.code == code))
        .or_else(|| users.first())
        .cloned()
}

/// Trait for user record backends.
///
/// Every backend offers the same observe/read/write/clear contract over its
/// state, whether that is one record or a list.
pub trait RecordStore: Send + Sync {
    /// What the store holds: a [`UserRecord`] or a list of them.
    type State: Clone + Send + Sync + 'static;

    /// Backend name for logs and metrics.
    fn backend(&self) -> &'static str;

    /// Subscribes to the current state and every later change.
    ///
    /// A failed read yields the default state instead of an error; corrupt
    /// data is still an error.
    fn observe(&self) -> Result<RecordStream<Self::State>>;

    /// Returns the current state (the first value `observe` would yield).
    fn read(&self) -> Result<Self::State>;

    /// Applies a partial update.
    ///
    /// List backends locate the record by `patch.code` and do not change it.
    fn write(&self, patch: &UserPatch) -> Result<()>;

    /// Resets the store to its default state.
    fn clear(&self) -> Result<()>;
}

/// Backends holding a list of users keyed by code.
pub trait ListRecordStore: RecordStore<State = Vec<UserRecord>> {
    /// Appends a user.
    fn add(&self, user: &UserRecord) -> Result<()>;

    /// Replaces the user with the same code.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if no user has
    /// that code.
    fn replace(&self, user: &UserRecord) -> Result<()>;

    /// Removes the user with `code`. Returns false if there was none.
    fn remove(&self, code: i32) -> Result<bool>;

    /// Returns the user with `code`, falling back to the first user.
    fn find(&self, code: Option<i32>) -> Result<Option<UserRecord>> {
        Ok(find_user(&self.read()?, code))
    }
}
