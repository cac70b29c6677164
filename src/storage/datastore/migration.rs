//! Data migrations run when a store first loads its file.
//!
//! A [`DataStore`](super::DataStore) runs its migrations once, under its
//! write lock, before publishing the first value. The migrated value is
//! written back before anyone can observe it, so observers never see the
//! pre-migration layout.
//!
//! Migrations must be idempotent: `should_migrate` has to return `false` for
//! any value `migrate` produced from the same source data.

use crate::Result;

/// A one-time transform applied to a store's data on first load.
pub trait DataMigration<T>: Send + Sync {
    /// Human-readable description, used in logs.
    fn description(&self) -> &'static str;

    /// Returns true if `current` still needs this migration.
    fn should_migrate(&self, current: &T) -> Result<bool>;

    /// Produces the migrated value.
    fn migrate(&self, current: T) -> Result<T>;
}

/// Runs each migration whose precondition holds, in order.
///
/// Returns the migrated value and whether any migration ran.
pub(crate) fn run_migrations<T>(
    migrations: &[Box<dyn DataMigration<T>>],
    mut data: T,
) -> Result<(T, bool)> {
    let mut ran = false;
    for migration in migrations {
        if migration.should_migrate(&data)? {
            tracing::info!(migration = migration.description(), "Applying data migration");
            data = migration.migrate(data)?;
            ran = true;
        }
    }
    Ok((data, ran))
}
