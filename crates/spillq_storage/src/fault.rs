//! Failure injection for persisters.

use crate::error::{StorageError, StorageResult};
use crate::persister::BatchPersister;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Wraps a persister and fails its operations on demand.
///
/// Intended for tests that need to exercise retry and degradation paths.
/// All switches are atomic, so a test can flip them while a queue holding
/// the persister is in use on other threads.
#[derive(Debug, Default)]
pub struct FaultyPersister<P> {
    inner: P,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_next_writes: AtomicU32,
    /// Milliseconds each write sleeps before doing anything.
    write_delay_ms: AtomicU64,
    write_attempts: AtomicU64,
    read_attempts: AtomicU64,
}

impl<P> FaultyPersister<P> {
    /// Wraps `inner` with every fault switched off.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_next_writes: AtomicU32::new(0),
            write_delay_ms: AtomicU64::new(0),
            write_attempts: AtomicU64::new(0),
            read_attempts: AtomicU64::new(0),
        }
    }

    /// Makes every write fail until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every read fail until switched off.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fails the next `count` writes, then behaves normally.
    pub fn fail_next_writes(&self, count: u32) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Makes every write sleep for `delay` first, e.g. to outlast a timeout.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Returns how many writes were attempted, failed or not.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Returns how many reads were attempted, failed or not.
    pub fn read_attempts(&self) -> u64 {
        self.read_attempts.load(Ordering::SeqCst)
    }

    /// Returns the wrapped persister.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn should_fail_write(&self) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<T, P> BatchPersister<T> for FaultyPersister<P>
where
    P: BatchPersister<T>,
{
    fn write(&self, path: &Path, batch: &[T]) -> StorageResult<u64> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        if self.should_fail_write() {
            return Err(StorageError::Injected { operation: "write" });
        }
        self.inner.write(path, batch)
    }

    fn read(&self, path: &Path) -> StorageResult<Vec<T>> {
        self.read_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Injected { operation: "read" });
        }
        self.inner.read(path)
    }

    fn extension(&self) -> &'static str {
        self.inner.extension()
    }
}
