//! Page-sized chunks of a queue.
//!
//! A segment is either resident (all of its elements in memory) or
//! persisted (its flushed batch in exactly one spill file, plus anything
//! appended after the flush). Reloading happens implicitly at the top of
//! [`Segment::drain`] and [`Segment::persist`].
//!
//! # Locking
//!
//! - `put` guards appends
//! - `take` guards drains, persistence and the disk state (id, residency)
//! - `buffer` guards the element deque itself and is only held briefly
//!
//! Locks are always taken in the order `take`, `put`, `buffer`.

use crate::context::QueueContext;
use crate::error::{QueueError, QueueResult};
use parking_lot::Mutex;
use spillq_storage::StorageResult;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of attempts for writing one batch, each under a fresh id.
pub(crate) const WRITE_ATTEMPTS: u32 = 3;

/// Where a segment's flushed batch lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Residency {
    /// Every element is in memory.
    Resident,
    /// A batch of `count` elements is in the spill file named by the id.
    Persisted {
        /// Size of the spill file.
        bytes: u64,
        /// Elements in the spill file.
        count: usize,
    },
}

/// State guarded by the take lock.
#[derive(Debug)]
struct DiskState {
    /// Segment id; names the spill file. Replaced on write retries.
    id: u64,
    residency: Residency,
}

/// A page-sized chunk of the queue.
pub(crate) struct Segment<T> {
    ctx: Arc<QueueContext<T>>,
    put: Mutex<()>,
    take: Mutex<DiskState>,
    buffer: Mutex<VecDeque<T>>,
    /// Elements in memory and on disk.
    size: AtomicUsize,
    /// Elements in the spill file.
    size_in_disk: AtomicUsize,
    /// Set once the queue has discarded this segment.
    retired: AtomicBool,
}

impl<T> Segment<T> {
    /// Creates an empty, resident segment.
    pub(crate) fn new(id: u64, ctx: Arc<QueueContext<T>>) -> Self {
        Self {
            ctx,
            put: Mutex::new(()),
            take: Mutex::new(DiskState {
                id,
                residency: Residency::Resident,
            }),
            buffer: Mutex::new(VecDeque::new()),
            size: AtomicUsize::new(0),
            size_in_disk: AtomicUsize::new(0),
            retired: AtomicBool::new(false),
        }
    }

    /// Returns the current id. Blocks while a drain or persist is running.
    #[cfg(test)]
    pub(crate) fn id(&self) -> u64 {
        self.take.lock().id
    }

    /// Returns the current residency. Blocks while a drain or persist is running.
    #[cfg(test)]
    pub(crate) fn residency(&self) -> Residency {
        self.take.lock().residency
    }

    /// Returns the number of elements in memory and on disk.
    pub(crate) fn len(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Returns the number of elements in the spill file.
    pub(crate) fn disk_len(&self) -> usize {
        self.size_in_disk.load(Ordering::SeqCst)
    }

    /// Returns the number of elements in memory.
    pub(crate) fn heap_len(&self) -> usize {
        self.len().saturating_sub(self.disk_len())
    }

    /// Returns true if the segment holds no elements anywhere.
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the in-memory part reaches the page size.
    ///
    /// Reads counters only, so it never waits on a flush in progress.
    pub(crate) fn is_full(&self) -> bool {
        self.heap_len() >= self.ctx.config.page_size
    }

    /// Appends an element to the back of the segment.
    pub(crate) fn append(&self, element: T) {
        let _put = self.put.lock();
        self.buffer.lock().push_back(element);
        self.size.fetch_add(1, Ordering::SeqCst);
    }

    /// Moves up to `max_count` elements from the front of the segment into
    /// `sink`, reloading the spill file first if there is one.
    ///
    /// Returns the number of elements moved.
    ///
    /// # Errors
    ///
    /// Returns a corruption-class error if the spill file is missing or
    /// unreadable. Nothing is moved in that case.
    pub(crate) fn drain<E>(&self, sink: &mut E, max_count: usize) -> QueueResult<usize>
    where
        E: Extend<T>,
    {
        let mut disk = self.take.lock();
        tracing::trace!(segment_id = disk.id, max_count, "segment drain");

        self.reload(&mut disk)?;

        let mut buffer = self.buffer.lock();
        let count = max_count.min(buffer.len());
        sink.extend(buffer.drain(..count));
        self.size.fetch_sub(count, Ordering::SeqCst);

        Ok(count)
    }

    /// Flushes the whole in-memory buffer to a new spill file.
    ///
    /// Returns the number of elements written. Zero means nothing was
    /// written: the buffer was empty, the segment was retired, or every
    /// write attempt failed. After a failed flush the buffer is intact.
    ///
    /// # Errors
    ///
    /// Returns a corruption-class error if an earlier spill file could not
    /// be reloaded first.
    pub(crate) fn persist(&self) -> QueueResult<usize> {
        let mut disk = self.take.lock();
        let _put = self.put.lock();

        if self.retired.load(Ordering::SeqCst) {
            return Ok(0);
        }

        self.reload(&mut disk)?;

        let mut buffer = self.buffer.lock();
        tracing::trace!(segment_id = disk.id, len = buffer.len(), "segment persist");
        if buffer.is_empty() {
            return Ok(0);
        }

        // The buffer is only cleared once a write has succeeded.
        let bytes = match self.write_with_retry(&mut disk, buffer.make_contiguous()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    segment_id = disk.id,
                    error = %e,
                    "failed to persist segment, keeping it in memory"
                );
                return Ok(0);
            }
        };

        let count = buffer.len();
        buffer.clear();

        self.size_in_disk.fetch_add(count, Ordering::SeqCst);
        let stats = &self.ctx.stats;
        stats.move_to_disk(count as i64);
        stats.add_disk_bytes(bytes as i64);
        stats.add_persisted_files(1);
        disk.residency = Residency::Persisted { bytes, count };

        tracing::trace!(segment_id = disk.id, count, bytes, "segment persisted");
        Ok(count)
    }

    /// Empties the segment and deletes its spill file.
    pub(crate) fn clear(&self) {
        let mut disk = self.take.lock();
        let _put = self.put.lock();
        tracing::trace!(segment_id = disk.id, "segment clear");

        self.buffer.lock().clear();
        self.size.store(0, Ordering::SeqCst);

        let in_disk = self.size_in_disk.swap(0, Ordering::SeqCst);
        self.ctx.stats.move_to_disk(-(in_disk as i64));

        if let Residency::Persisted { bytes, .. } = disk.residency {
            let path = self.ctx.segment_path(disk.id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    segment_id = disk.id,
                    error = %e,
                    "failed to delete spill file"
                ),
            }
            self.ctx.stats.add_disk_bytes(-(bytes as i64));
            self.ctx.stats.add_loaded_files(1);
        }
        disk.residency = Residency::Resident;
    }

    /// Marks the segment as discarded so late persist requests are refused.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// Reads the spill file back and prepends its batch to the buffer.
    fn reload(&self, disk: &mut DiskState) -> QueueResult<()> {
        let Residency::Persisted { bytes, count } = disk.residency else {
            return Ok(());
        };

        let path = self.ctx.segment_path(disk.id);
        if !path.exists() {
            return Err(QueueError::segment_corruption(
                disk.id,
                format!("spill file missing: {}", path.display()),
            ));
        }

        let batch = self
            .ctx
            .persister
            .read(&path)
            .map_err(|source| QueueError::Reload {
                segment_id: disk.id,
                source,
            })?;
        if batch.len() != count {
            return Err(QueueError::segment_corruption(
                disk.id,
                format!("spill file holds {} elements, expected {count}", batch.len()),
            ));
        }

        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(segment_id = disk.id, error = %e, "failed to delete reloaded spill file");
        }

        // The file holds the oldest elements; anything appended after the
        // flush must stay behind them, so prepend in reverse.
        {
            let mut buffer = self.buffer.lock();
            buffer.reserve(count);
            for element in batch.into_iter().rev() {
                buffer.push_front(element);
            }
        }

        self.size_in_disk.fetch_sub(count, Ordering::SeqCst);
        let stats = &self.ctx.stats;
        stats.move_to_disk(-(count as i64));
        stats.add_loaded_files(1);
        stats.add_disk_bytes(-(bytes as i64));
        disk.residency = Residency::Resident;

        tracing::trace!(segment_id = disk.id, count, "segment reloaded from disk");
        Ok(())
    }

    /// Writes `batch`, moving to a fresh id after each failed attempt.
    fn write_with_retry(&self, disk: &mut DiskState, batch: &[T]) -> StorageResult<u64> {
        let mut attempt = 1;
        loop {
            let path = self.ctx.segment_path(disk.id);
            match self.ctx.persister.write(&path, batch) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    let previous = disk.id;
                    disk.id = self.ctx.next_segment_id();
                    tracing::trace!(
                        previous,
                        segment_id = disk.id,
                        attempt,
                        error = %e,
                        "spill write failed, retrying under a new id"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T> std::fmt::Debug for Segment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("len", &self.len())
            .field("disk_len", &self.disk_len())
            .field("retired", &self.retired.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
