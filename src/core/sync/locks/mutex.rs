/*!
 * Queue Mutex
 * Data-owning mutex on top of the MCS queue lock
 */

use super::mcs::McsLock;
use super::stats::LockStatsSnapshot;
use crate::core::errors::LockResult;
use crate::core::sync::config::SpinConfig;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::error;

/// Mutex protecting a `T` with FIFO queue admission
///
/// # Example
///
/// ```
/// use mcs_queue_lock::QueueMutex;
///
/// let counter = QueueMutex::new(0u64);
/// *counter.lock()? += 1;
/// assert_eq!(counter.into_inner(), 1);
/// # Ok::<(), mcs_queue_lock::LockError>(())
/// ```
pub struct QueueMutex<T> {
    lock: McsLock,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `lock`
unsafe impl<T: Send> Sync for QueueMutex<T> {}

impl<T> QueueMutex<T> {
    /// Create an unlocked mutex with the default spin policy
    pub fn new(data: T) -> Self {
        Self::with_config(data, SpinConfig::default())
    }

    /// Create an unlocked mutex with a custom spin policy
    pub fn with_config(data: T, config: SpinConfig) -> Self {
        Self {
            lock: McsLock::with_config(config),
            data: UnsafeCell::new(data),
        }
    }

    /// Queue up and return a guard once at the head
    pub fn lock(&self) -> LockResult<QueueMutexGuard<'_, T>> {
        self.lock.acquire()?;
        Ok(self.guard())
    }

    /// Lock only if nobody holds or waits
    pub fn try_lock(&self) -> LockResult<Option<QueueMutexGuard<'_, T>>> {
        Ok(self.lock.try_acquire()?.then(|| self.guard()))
    }

    /// Keep trying for up to `timeout`
    pub fn try_lock_for(&self, timeout: Duration) -> LockResult<QueueMutexGuard<'_, T>> {
        self.lock.try_acquire_for(timeout)?;
        Ok(self.guard())
    }

    /// Mutable access without locking; the borrow proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the mutex and return the data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Usage counters of the underlying lock
    pub fn stats(&self) -> LockStatsSnapshot {
        self.lock.stats()
    }

    /// Whether the mutex is held or contended (advisory)
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    #[inline]
    fn guard(&self) -> QueueMutexGuard<'_, T> {
        QueueMutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }
}

impl<T: Default> Default for QueueMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for QueueMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueMutex")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

/// Access to the data of a locked [`QueueMutex`]
///
/// Not `Send`: the release must run on the acquiring thread.
#[must_use = "dropping the guard unlocks the mutex immediately"]
pub struct QueueMutexGuard<'a, T> {
    mutex: &'a QueueMutex<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for QueueMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while this thread holds the lock
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for QueueMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while this thread holds the lock
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for QueueMutexGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.mutex.lock.release() {
            error!(error = %e, "Mutex guard release failed");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueueMutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::LockError;
    use std::thread;

    #[test]
    fn test_concurrent_counter() {
        let counter = QueueMutex::new(0u64);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        *counter.lock().unwrap() += 1;
                    }
                });
            }
        });

        assert!(!counter.is_locked());
        assert_eq!(counter.stats().acquisitions, 8_000);
        assert_eq!(counter.into_inner(), 8_000);
    }

    #[test]
    fn test_try_lock_while_held() {
        let data = QueueMutex::new(vec![1, 2, 3]);
        let mut guard = data.lock().unwrap();
        guard.push(4);

        thread::scope(|s| {
            s.spawn(|| {
                assert!(data.try_lock().unwrap().is_none());
                assert!(matches!(
                    data.try_lock_for(Duration::from_millis(10)),
                    Err(LockError::Timeout { .. })
                ));
            });
        });

        drop(guard);
        assert_eq!(*data.try_lock().unwrap().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_get_mut() {
        let mut data = QueueMutex::new(String::from("a"));
        data.get_mut().push('b');
        assert_eq!(data.into_inner(), "ab");
    }
}
