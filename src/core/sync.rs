//! Synchronization utilities for robust lock handling
//!
//! Queue offsets, consumer group cursors and the registries all live behind
//! std locks. A poisoned lock means a panic happened mid-mutation, so the
//! helpers here turn poison into the caller's error type instead of
//! propagating the panic.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

/// Handle poisoned mutex cases with consistent error handling
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use stashq::core::sync::handle_mutex_poison;
/// use stashq::queue::QueueError;
///
/// let mutex = Mutex::new(42u64);
/// let guard = handle_mutex_poison(mutex.lock(), |message| QueueError::Poisoned { message })
///     .unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<MutexGuard<'_, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'_, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock read operations with consistent error handling
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<'_, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'_, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock write operations with consistent error handling
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<'_, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'_, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, RwLock};
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct TestError {
        message: String,
    }

    #[test]
    fn test_handle_mutex_poison_success() {
        let mutex = Mutex::new(42);
        let result = handle_mutex_poison(mutex.lock(), |msg| TestError { message: msg });
        assert_eq!(*result.unwrap(), 42);
    }

    #[test]
    fn test_handle_rwlock_write_with_poisoned_lock() {
        let lock = Arc::new(RwLock::new(7u64));
        let lock_clone = Arc::clone(&lock);

        let _ = thread::spawn(move || {
            let _guard = lock_clone.write().unwrap();
            panic!("Intentional panic to poison lock");
        })
        .join();

        let result = handle_rwlock_write(lock.write(), |msg| TestError { message: msg });
        let error = result.unwrap_err();
        assert!(error.message.contains("RwLock write poisoned"));

        let result = handle_rwlock_read(lock.read(), |msg| TestError { message: msg });
        assert!(result.unwrap_err().message.contains("RwLock read poisoned"));
    }

    #[test]
    fn test_handle_rwlock_read_success() {
        let rwlock = RwLock::new((1u64, 2u64));
        let guard = handle_rwlock_read(rwlock.read(), |msg| TestError { message: msg }).unwrap();
        assert_eq!(*guard, (1, 2));
    }
}
