//! Mutex handling shared by every backend.
//!
//! Each store serialises its writers behind one `Mutex`. A panic inside a
//! critical section must not take the store down with it, so poisoned locks
//! are recovered instead of propagated.

use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex lock, recovering the inner value if it was poisoned.
///
/// # Examples
///
/// ```
/// use std::sync::Mutex;
/// use userstore::storage::acquire_lock;
///
/// let mutex = Mutex::new(41);
/// *acquire_lock(&mutex) += 1;
/// assert_eq!(*acquire_lock(&mutex), 42);
/// ```
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Store mutex was poisoned, recovering");
            metrics::counter!("storage_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}
