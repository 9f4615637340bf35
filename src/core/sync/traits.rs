/*!
 * Synchronization Traits
 *
 * The acquire/release seam shared by the queue lock and anything that wants
 * to drive it generically (benchmarks, the conformance harness).
 */

use crate::core::errors::LockResult;

/// A lock whose ownership is tied to the calling thread
///
/// # Contract
///
/// - `acquire` returns only once the calling thread holds the lock
/// - `release` must be called by the thread that acquired, exactly once per
///   successful `acquire`
pub trait RawLock: Send + Sync {
    /// Block (spinning) until the calling thread holds the lock
    fn acquire(&self) -> LockResult<()>;

    /// Give up the lock held by the calling thread
    fn release(&self) -> LockResult<()>;

    /// Lock name for logs and reports
    fn name(&self) -> &'static str;

    /// Run `f` with the lock held, releasing even if `f` unwinds
    fn run_exclusive<R>(&self, f: impl FnOnce() -> R) -> LockResult<R>
    where
        Self: Sized,
    {
        struct ReleaseOnDrop<'a, L: RawLock>(&'a L);

        impl<L: RawLock> Drop for ReleaseOnDrop<'_, L> {
            fn drop(&mut self) {
                if let Err(e) = self.0.release() {
                    tracing::error!(lock = self.0.name(), error = %e, "Release after critical section failed");
                }
            }
        }

        self.acquire()?;
        let _release = ReleaseOnDrop(self);
        Ok(f())
    }
}

/// No-op lock, used to run a workload without mutual exclusion
#[derive(Debug, Default, Clone, Copy)]
pub struct Unguarded;

impl RawLock for Unguarded {
    #[inline]
    fn acquire(&self) -> LockResult<()> {
        Ok(())
    }

    #[inline]
    fn release(&self) -> LockResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "unguarded"
    }
}
