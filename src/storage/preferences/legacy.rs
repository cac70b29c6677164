//! Legacy flat key-value store.
//!
//! The oldest layout: one JSON map with a key per field. Besides the
//! record stream every backend has, it publishes one [`KeyChange`] per key
//! that a commit actually changed, so listeners can react to single fields.

use super::Preferences;
use crate::models::{Profession, UserPatch, UserRecord};
use crate::storage::acquire_lock;
use crate::storage::datastore::{DataStore, JsonCodec};
use crate::storage::traits::{RecordStore, RecordStream, watch_stream};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::instrument;

/// File name of the legacy store inside the data directory.
pub const LEGACY_PREFS_FILE: &str = "shared_prefs.json";

/// File name of the secondary legacy store, read only by the preferences
/// migration.
pub const EXTRA_LEGACY_PREFS_FILE: &str = "extra_shared_prefs.json";

const KEY_EVENT_CAPACITY: usize = 64;

/// A single key changed in the legacy store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// The key that changed.
    pub key: String,
    /// The user as read after the commit.
    pub user: UserRecord,
}

/// Subscription to key changes.
///
/// Dropping the listener, or calling [`KeyListener::cancel`], unregisters it.
pub struct KeyListener {
    receiver: broadcast::Receiver<KeyChange>,
}

impl KeyListener {
    /// Waits for the next key change.
    ///
    /// Returns `None` once the store is gone. Changes missed because the
    /// listener fell behind are skipped.
    pub async fn recv(&mut self) -> Option<KeyChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Key listener lagged behind");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next pending key change without waiting.
    pub fn try_recv(&mut self) -> Option<KeyChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {},
                Err(_) => return None,
            }
        }
    }

    /// Unregisters the listener.
    pub fn cancel(self) {}
}

/// Flat key-value store in the legacy layout.
///
/// Key changes are delivered in commit order: each listener sees the events
/// of one commit before those of the next.
pub struct LegacyPrefsStore {
    data: DataStore<Preferences>,
    key_events: broadcast::Sender<KeyChange>,
    /// Held across a commit and its key events.
    commits: Mutex<()>,
}

impl LegacyPrefsStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (key_events, _receiver) = broadcast::channel(KEY_EVENT_CAPACITY);
        Self {
            data: DataStore::new(path, JsonCodec),
            key_events,
            commits: Mutex::new(()),
        }
    }

    /// Creates a store under `dir` using the standard file name.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LEGACY_PREFS_FILE))
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data.path()
    }

    /// Registers a key-change listener.
    pub fn subscribe_keys(&self) -> KeyListener {
        KeyListener {
            receiver: self.key_events.subscribe(),
        }
    }

    /// Returns every stored key, failing if the file cannot be read.
    pub fn snapshot(&self) -> Result<Preferences> {
        self.data.fetch()
    }

    /// Reads the user.
    pub fn read_user(&self) -> Result<UserRecord> {
        Ok(self.data.current()?.to_user())
    }

    /// Reads the name (empty if unset).
    pub fn name(&self) -> Result<String> {
        Ok(self.read_user()?.name)
    }

    /// Reads the contact address (empty if unset).
    pub fn email(&self) -> Result<String> {
        Ok(self.read_user()?.email)
    }

    /// Reads the code (zero if unset).
    pub fn code(&self) -> Result<i32> {
        Ok(self.read_user()?.code)
    }

    /// Reads the profession ([`Profession::Other`] if unset).
    pub fn profession(&self) -> Result<Profession> {
        Ok(self.read_user()?.profession)
    }

    /// Writes the name on its own.
    pub fn put_name(&self, name: impl Into<String>) -> Result<()> {
        self.commit(&UserPatch::new().name(name))
    }

    /// Writes the contact address on its own.
    pub fn put_email(&self, email: impl Into<String>) -> Result<()> {
        self.commit(&UserPatch::new().email(email))
    }

    /// Writes the code on its own.
    pub fn put_code(&self, code: i32) -> Result<()> {
        self.commit(&UserPatch::new().code(code))
    }

    /// Writes the profession on its own.
    pub fn put_profession(&self, profession: Profession) -> Result<()> {
        self.commit(&UserPatch::new().profession(profession))
    }

    /// Writes every field of `patch` in one commit.
    fn commit(&self, patch: &UserPatch) -> Result<()> {
        let _commit = acquire_lock(&self.commits);
        let mut changed = Vec::new();
        let updated = self.data.update_data(|prefs| {
            let mut next = prefs.clone();
            changed = next.apply_patch(patch);
            Ok(next)
        })?;
        self.notify(changed.iter().copied(), &updated.to_user());
        Ok(())
    }

    fn notify<'a>(&self, changed: impl Iterator<Item = &'a str>, user: &UserRecord) {
        for key in changed {
            tracing::trace!(key, "Legacy preference changed");
            // No listeners is fine
            let _ = self.key_events.send(KeyChange {
                key: key.to_string(),
                user: user.clone(),
            });
        }
    }
}

impl RecordStore for LegacyPrefsStore {
    type State = UserRecord;

    fn backend(&self) -> &'static str {
        "legacy-prefs"
    }

    fn observe(&self) -> Result<RecordStream<UserRecord>> {
        Ok(watch_stream(self.data.subscribe()?, |prefs| prefs.to_user()))
    }

    fn read(&self) -> Result<UserRecord> {
        self.read_user()
    }

    #[instrument(skip(self, patch), fields(backend = "legacy-prefs", operation = "write"))]
    fn write(&self, patch: &UserPatch) -> Result<()> {
        self.commit(patch)
    }

    #[instrument(skip(self), fields(backend = "legacy-prefs", operation = "clear"))]
    fn clear(&self) -> Result<()> {
        let _commit = acquire_lock(&self.commits);
        let mut removed = Vec::new();
        self.data.update_data(|prefs| {
            removed = prefs.iter().map(|(key, _)| key.to_string()).collect();
            Ok(Preferences::new())
        })?;
        self.notify(removed.iter().map(String::as_str), &UserRecord::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::preferences::keys;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    fn store(dir: &TempDir) -> LegacyPrefsStore {
        LegacyPrefsStore::in_dir(dir.path())
    }

    #[test]
    fn test_empty_store_reads_default() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.read().unwrap(), UserRecord::default());
        assert_eq!(store.profession().unwrap(), Profession::Other);
    }

    #[test]
    fn test_put_single_fields() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.put_name("Ana").unwrap();
        store.put_code(7).unwrap();
        store.put_profession(Profession::Engineer).unwrap();

        assert_eq!(store.name().unwrap(), "Ana");
        assert_eq!(store.email().unwrap(), "");
        assert_eq!(store.code().unwrap(), 7);
        assert_eq!(store.profession().unwrap(), Profession::Engineer);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store(&dir).put_email("ana@example.com").unwrap();

        assert_eq!(store(&dir).email().unwrap(), "ana@example.com");
    }

    #[test]
    fn test_key_listener_gets_one_event_per_changed_key() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put_name("Ana").unwrap();

        let mut listener = store.subscribe_keys();
        store
            .write(&UserPatch::new().name("Ana").email("a@b.c").code(3))
            .unwrap();

        let first = listener.try_recv().unwrap();
        let second = listener.try_recv().unwrap();
        assert_eq!(first.key, keys::EMAIL);
        assert_eq!(second.key, keys::CODE);
        assert_eq!(second.user.code, 3);
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn test_cancelled_listener_stops_counting() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let listener = store.subscribe_keys();
        assert_eq!(store.key_events.receiver_count(), 1);
        listener.cancel();
        assert_eq!(store.key_events.receiver_count(), 0);

        store.put_name("still fine").unwrap();
    }

    #[test]
    fn test_clear_notifies_removed_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put_name("Ana").unwrap();
        store.put_code(1).unwrap();

        let mut listener = store.subscribe_keys();
        store.clear().unwrap();

        let mut keys_seen = vec![
            listener.try_recv().unwrap().key,
            listener.try_recv().unwrap().key,
        ];
        keys_seen.sort();
        assert_eq!(keys_seen, vec!["code".to_string(), "name".to_string()]);
        assert_eq!(store.read().unwrap(), UserRecord::default());
    }

    #[tokio::test]
    async fn test_observe_emits_current_then_updates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put_name("Ana").unwrap();

        let mut stream = store.observe().unwrap();
        assert_eq!(stream.next().await.unwrap().name, "Ana");

        store.put_name("Bia").unwrap();
        assert_eq!(stream.next().await.unwrap().name, "Bia");
    }

    #[test]
    fn test_concurrent_commits_deliver_events_in_order() {
        const ROUNDS: i32 = 30;
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store(&dir));
        let mut listener = store.subscribe_keys();

        let codes = {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for code in 1..=ROUNDS {
                    store.put_code(code).unwrap();
                }
            })
        };
        let names = {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 1..=ROUNDS {
                    store.put_name(format!("{n:03}")).unwrap();
                }
            })
        };
        codes.join().unwrap();
        names.join().unwrap();

        let mut last_code = 0;
        let mut last_name = 0;
        let mut seen = 0;
        while let Some(change) = listener.try_recv() {
            let name: i32 = change.user.name.parse().unwrap_or(0);
            assert!(change.user.code >= last_code);
            assert!(name >= last_name);
            last_code = change.user.code;
            last_name = name;
            seen += 1;
        }
        assert_eq!(seen, 2 * ROUNDS);
        assert_eq!((last_code, last_name), (ROUNDS, ROUNDS));
    }
}
