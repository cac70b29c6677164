//! File-backed observable data store.
//!
//! [`DataStore`] holds one value of type `T` in a single file. It is the
//! building block of every file-based backend:
//!
//! - **Lazy load**: the file is read, decoded, and migrated on first access
//! - **Single writer**: updates are serialised by a mutex, each one seeing
//!   the result of the previous one
//! - **Atomic replace**: the encoded value goes to a temporary file that is
//!   renamed over the target, so a reader never sees half a write
//! - **Multicast**: subscribers get the current value followed by every
//!   change, through a `tokio::sync::watch` channel
//!
//! # Failure policy
//!
//! A read that fails with an I/O error is absorbed by [`DataStore::subscribe`]
//! and [`DataStore::current`]: the default value is served, a warning is
//! logged, and the load is retried on the next access. Undecodable bytes are
//! always surfaced as [`Error::Corruption`]. Updates never absorb failures.

mod codec;
mod migration;

pub use codec::{Codec, CodecError, JsonCodec};
pub use migration::DataMigration;

use crate::storage::acquire_lock;
use crate::{Error, Result};
use migration::run_migrations;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;

/// A single value persisted in one file.
pub struct DataStore<T, C = JsonCodec> {
    /// File holding the encoded value.
    path: PathBuf,
    /// Codec for the file contents.
    codec: C,
    /// Migrations applied on first load.
    migrations: Vec<Box<dyn DataMigration<T>>>,
    /// Writer lock. `true` once the file has been loaded and migrated.
    loaded: Mutex<bool>,
    /// Current value, multicast to subscribers.
    sender: watch::Sender<T>,
}

impl<T, C> DataStore<T, C>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
    C: Codec<T>,
{
    /// Creates a store for `path`. Nothing is read until first access.
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        let (sender, _receiver) = watch::channel(T::default());
        Self {
            path: path.into(),
            codec,
            migrations: Vec::new(),
            loaded: Mutex::new(false),
            sender,
        }
    }

    /// Adds a migration to run on first load.
    #[must_use]
    pub fn with_migration(mut self, migration: impl DataMigration<T> + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subscribes to the current value and every later change.
    ///
    /// The receiver's initial value is the current one.
    pub fn subscribe(&self) -> Result<watch::Receiver<T>> {
        let mut loaded = acquire_lock(&self.loaded);
        self.load(&mut loaded, true)?;
        Ok(self.sender.subscribe())
    }

    /// Returns the current value.
    pub fn current(&self) -> Result<T> {
        let mut loaded = acquire_lock(&self.loaded);
        self.load(&mut loaded, true)?;
        Ok(self.sender.borrow().clone())
    }

    /// Returns the current value, failing if the file cannot be read.
    pub fn fetch(&self) -> Result<T> {
        let mut loaded = acquire_lock(&self.loaded);
        self.load(&mut loaded, false)?;
        Ok(self.sender.borrow().clone())
    }

    /// Atomically replaces the value with `transform(current)`.
    ///
    /// Nothing is written or published if the new value equals the old one.
    /// Returns the value now stored.
    pub fn update_data<F>(&self, transform: F) -> Result<T>
    where
        F: FnOnce(&T) -> Result<T>,
    {
        let mut loaded = acquire_lock(&self.loaded);
        self.load(&mut loaded, false)?;

        let current = self.sender.borrow().clone();
        let updated = transform(&current)?;
        if updated != current {
            self.write_to_disk(&updated)?;
            self.publish(updated.clone());
        }
        Ok(updated)
    }

    /// Loads, migrates, and publishes the stored value if not done yet.
    fn load(&self, loaded: &mut bool, lenient: bool) -> Result<()> {
        if *loaded {
            return Ok(());
        }

        match self.read_and_migrate() {
            Ok(data) => {
                self.publish(data);
                *loaded = true;
                Ok(())
            },
            Err(Error::OperationFailed { operation, cause }) if lenient => {
                tracing::warn!(
                    path = %self.path.display(),
                    operation,
                    cause,
                    "Failed to load store, serving default value"
                );
                metrics::counter!("storage_read_failures_absorbed_total").increment(1);
                self.publish(T::default());
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    fn read_and_migrate(&self) -> Result<T> {
        let stored = self.read_from_disk()?;
        if self.migrations.is_empty() {
            return Ok(stored);
        }

        let (migrated, ran) = run_migrations(&self.migrations, stored.clone())?;
        if ran && migrated != stored {
            self.write_to_disk(&migrated)?;
        }
        Ok(migrated)
    }

    fn read_from_disk(&self) -> Result<T> {
        match fs::read(&self.path) {
            Ok(bytes) => self.codec.decode(&bytes).map_err(|e| Error::Corruption {
                path: self.path.clone(),
                cause: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(Error::operation("read_data_file", e)),
        }
    }

    fn write_to_disk(&self, value: &T) -> Result<()> {
        let bytes = self
            .codec
            .encode(value)
            .map_err(|e| Error::operation("encode_data", e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::operation("create_store_dir", e))?;
        }

        // Atomic write: temp file in the same directory, then rename
        let tmp_path = self.tmp_path();
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::operation("write_data_file", e));
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::operation("replace_data_file", e)
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "data".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn publish(&self, value: T) {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
