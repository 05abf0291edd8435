//! The spilling queue.

use crate::config::QueueConfig;
use crate::context::QueueContext;
use crate::dir::SpillDir;
use crate::error::{QueueError, QueueResult};
use crate::monitor::Monitor;
use crate::segment::Segment;
use crate::stats::QueueStats;
use crate::worker::PersistWorker;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spillq_storage::{BatchPersister, JsonFilePersister};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

/// A bounded FIFO queue that spills full segments to disk.
///
/// Elements are kept in page-sized segments. When the number of elements in
/// memory nears the heap capacity, an enqueue flushes older full segments to
/// spill files on a background worker before admitting the new element.
/// Draining reads spill files back transparently, so order is strictly
/// first in, first out across memory and disk.
///
/// # Opening a queue
///
/// ```rust,ignore
/// use spillq_core::{QueueConfig, SpillQueue};
///
/// let config = QueueConfig::new("events")
///     .capacity(100_000)
///     .heap_capacity(3_000)
///     .page_size(1_000);
/// let queue: SpillQueue<String> = SpillQueue::open(config)?;
///
/// queue.push("hello".to_string())?;
///
/// let mut out = Vec::new();
/// queue.drain_into(&mut out, 100)?;
/// ```
///
/// # Admission
///
/// [`push`](Self::push) rejects an element when the queue is at capacity,
/// when spill files already fill the disk quota, or when heap pressure
/// cannot be relieved. Rejections leave the queue unchanged; use
/// [`offer`](Self::offer) for a plain `bool` outcome.
pub struct SpillQueue<T> {
    ctx: Arc<QueueContext<T>>,
    /// Segments, oldest first. Only the last one accepts appends.
    segments: Mutex<VecDeque<Arc<Segment<T>>>>,
    put_lock: Mutex<()>,
    take_lock: Mutex<()>,
    // Threads stop before the directory lock is released.
    monitor: Option<Monitor>,
    worker: Option<PersistWorker>,
    dir: Option<SpillDir>,
}

impl<T> SpillQueue<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Opens a queue that spills to JSON files.
    ///
    /// # Errors
    ///
    /// See [`SpillQueue::with_shared_persister`].
    pub fn open(config: QueueConfig) -> QueueResult<Self> {
        Self::with_persister(config, JsonFilePersister::new())
    }
}

impl<T: Send + 'static> SpillQueue<T> {
    /// Opens a queue that spills through `persister`.
    ///
    /// # Errors
    ///
    /// See [`SpillQueue::with_shared_persister`].
    pub fn with_persister<P>(config: QueueConfig, persister: P) -> QueueResult<Self>
    where
        P: BatchPersister<T> + 'static,
    {
        Self::with_shared_persister(config, Arc::new(persister))
    }

    /// Opens a queue that spills through a shared persister.
    ///
    /// The configuration is normalized first. With disk usage enabled, the
    /// spill directory is locked and recreated empty, and the persist worker
    /// is started.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The queue name is unusable as a directory name
    /// - Another live queue owns the spill directory
    /// - The spill directory cannot be recreated
    /// - A background thread cannot be spawned
    pub fn with_shared_persister(
        config: QueueConfig,
        persister: Arc<dyn BatchPersister<T>>,
    ) -> QueueResult<Self> {
        let config = config.normalized();
        config.validate()?;

        let (dir, worker) = if config.using_disk {
            let dir = SpillDir::open(&config.disk_root, &config.name)?;
            let worker = PersistWorker::spawn(&config.name)?;
            (Some(dir), Some(worker))
        } else {
            (None, None)
        };
        let spill_dir = dir
            .as_ref()
            .map_or_else(|| config.spill_dir(), |d| d.path().to_path_buf());

        let stats = Arc::new(QueueStats::new());
        let monitor = match config.monitor_interval {
            Some(interval) => Some(Monitor::spawn(config.clone(), Arc::clone(&stats), interval)?),
            None => None,
        };

        let ctx = Arc::new(QueueContext::new(config, stats, persister, spill_dir));
        let first = Arc::new(Segment::new(ctx.next_segment_id(), Arc::clone(&ctx)));

        Ok(Self {
            ctx,
            segments: Mutex::new(VecDeque::from([first])),
            put_lock: Mutex::new(()),
            take_lock: Mutex::new(()),
            monitor,
            worker,
            dir,
        })
    }

    /// Appends an element to the back of the queue.
    ///
    /// May block while older segments are flushed to disk, for at most the
    /// persist timeout per segment.
    ///
    /// # Errors
    ///
    /// - `CapacityExceeded` if the queue already holds `capacity` elements
    /// - `DiskQuotaExceeded` if spill files fill the disk quota
    /// - `HeapExhausted` if heap pressure could not be relieved
    /// - A corruption-class error if a segment chosen for flushing could not
    ///   reload its earlier spill file
    ///
    /// The queue is unchanged after any error.
    pub fn push(&self, element: T) -> QueueResult<()> {
        let _put = self.put_lock.lock();
        let config = &self.ctx.config;
        let stats = &self.ctx.stats;

        let size = self.len();
        if size >= config.capacity {
            tracing::warn!(queue = %config.name, capacity = config.capacity, size, "queue full");
            return Err(QueueError::CapacityExceeded {
                capacity: config.capacity,
                size,
            });
        }
        if self.is_disk_quota_exceeded() {
            let used = stats.disk_bytes();
            tracing::warn!(
                queue = %config.name,
                max_disk_size = config.max_disk_size,
                used,
                "disk quota exceeded"
            );
            return Err(QueueError::DiskQuotaExceeded {
                max_disk_size: config.max_disk_size,
                used,
            });
        }

        stats.add_total(1);
        if let Err(e) = self.relieve_heap_pressure() {
            stats.add_total(-1);
            tracing::warn!(queue = %config.name, error = %e, "failed to relieve heap pressure");
            return Err(e);
        }

        let heap_size = stats.heap_size();
        if heap_size > config.heap_capacity as i64 {
            stats.add_total(-1);
            tracing::warn!(
                queue = %config.name,
                heap_capacity = config.heap_capacity,
                heap_size,
                "heap exhausted"
            );
            return Err(QueueError::HeapExhausted {
                heap_capacity: config.heap_capacity,
                heap_size,
            });
        }

        self.tail_for_append().append(element);
        Ok(())
    }

    /// Appends an element, returning whether it was admitted.
    ///
    /// Every failure, rejection or not, is logged and reported as `false`.
    pub fn offer(&self, element: T) -> bool {
        match self.push(element) {
            Ok(()) => true,
            Err(e) if e.is_rejection() => false,
            Err(e) => {
                tracing::error!(queue = %self.ctx.config.name, error = %e, "enqueue failed");
                false
            }
        }
    }

    /// Moves up to `max_count` elements from the front of the queue into
    /// `sink`, in insertion order. Returns the number moved.
    ///
    /// Segments emptied by the drain are discarded, except the newest one.
    ///
    /// # Errors
    ///
    /// Returns a corruption-class error if a spill file is missing or
    /// unreadable. If elements were already moved into `sink` before the
    /// failure, the error is `PartialDrain` carrying that count; those
    /// elements have left the queue and are no longer counted in its size.
    /// The size is reconciled on failure too, so `len()` always matches what
    /// is still drainable rather than counting elements already handed out.
    pub fn drain_into<E>(&self, sink: &mut E, max_count: usize) -> QueueResult<usize>
    where
        E: Extend<T>,
    {
        let _take = self.take_lock.lock();
        tracing::trace!(queue = %self.ctx.config.name, max_count, "drain");

        let mut drained = 0;
        let mut failure = None;
        let mut index = 0;

        while drained < max_count {
            let Some(segment) = self.segments.lock().get(index).cloned() else {
                break;
            };

            match segment.drain(sink, max_count - drained) {
                Ok(count) => drained += count,
                Err(e) => {
                    tracing::error!(queue = %self.ctx.config.name, error = %e, "drain failed");
                    failure = Some(e);
                    break;
                }
            }

            if !self.discard_if_drained(index, &segment) {
                index += 1;
            }
        }

        if drained > 0 {
            self.ctx.stats.add_total(-(drained as i64));
        }

        match failure {
            None => Ok(drained),
            Some(e) if drained == 0 => Err(e),
            Some(e) => Err(QueueError::PartialDrain {
                drained,
                source: Box::new(e),
            }),
        }
    }

    /// Removes every element and spill file and zeroes every counter.
    ///
    /// Blocks producers and consumers for its duration. A flush still
    /// running on the worker finishes first and its file is then deleted.
    pub fn clear(&self) {
        let _take = self.take_lock.lock();
        let _put = self.put_lock.lock();
        tracing::trace!(queue = %self.ctx.config.name, "clear");

        let segments: Vec<_> = self.segments.lock().drain(..).collect();
        for segment in &segments {
            segment.retire();
            segment.clear();
        }

        // Retired segments refuse late flushes, so no file can appear now.
        let stats = &self.ctx.stats;
        stats.add_total(-stats.total_size());
        stats.reset_file_history();
    }

    // === Queries ===

    /// Returns the number of elements in the queue.
    pub fn len(&self) -> usize {
        self.ctx.stats.total_size().max(0) as usize
    }

    /// Returns the number of elements held in memory.
    pub fn heap_len(&self) -> usize {
        self.ctx.stats.heap_size().max(0) as usize
    }

    /// Returns true if the queue holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if spill files fill the disk quota.
    pub fn is_disk_quota_exceeded(&self) -> bool {
        self.ctx.stats.disk_bytes() >= self.ctx.config.max_disk_size
    }

    /// Returns a one-line description of the configuration and counters.
    pub fn summary(&self) -> String {
        format!("{}, {}", self.ctx.config, self.ctx.stats)
    }

    /// Returns the queue's counters.
    ///
    /// The handle can outlive the queue, e.g. for an external monitor.
    pub fn stats(&self) -> &Arc<QueueStats> {
        &self.ctx.stats
    }

    /// Returns the normalized configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.ctx.config
    }

    /// Returns the spill directory, or `None` when disk usage is disabled.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(SpillDir::path)
    }

    /// Returns the number of segments currently held.
    pub fn segment_count(&self) -> usize {
        self.segments.lock().len()
    }

    // === Internals ===

    /// Returns the segment to append to, opening a new tail if needed.
    fn tail_for_append(&self) -> Arc<Segment<T>> {
        let mut segments = self.segments.lock();
        match segments.back() {
            Some(tail) if !tail.is_full() => Arc::clone(tail),
            _ => {
                let tail = Arc::new(Segment::new(
                    self.ctx.next_segment_id(),
                    Arc::clone(&self.ctx),
                ));
                tracing::trace!(queue = %self.ctx.config.name, "opened new tail segment");
                segments.push_back(Arc::clone(&tail));
                tail
            }
        }
    }

    /// Discards `segment` if it is empty and not the newest. Returns true if
    /// it was removed.
    fn discard_if_drained(&self, index: usize, segment: &Arc<Segment<T>>) -> bool {
        let mut segments = self.segments.lock();
        let removable = segment.is_empty()
            && index + 1 < segments.len()
            && segments.get(index).is_some_and(|s| Arc::ptr_eq(s, segment));
        if removable {
            segments.remove(index);
            segment.retire();
        }
        removable
    }

    /// Flushes full segments, newest first and skipping the tail, until
    /// heap usage drops out of the danger zone or no segment is left.
    fn relieve_heap_pressure(&self) -> QueueResult<()> {
        let Some(worker) = self.worker.as_ref() else {
            return Ok(());
        };
        let config = &self.ctx.config;
        let stats = &self.ctx.stats;
        let heap_capacity = config.heap_capacity as i64;

        if stats.heap_size() < heap_capacity {
            return Ok(());
        }

        let candidates: Vec<_> = self.segments.lock().iter().rev().skip(1).cloned().collect();
        tracing::debug!(
            queue = %config.name,
            heap_size = stats.heap_size(),
            candidates = candidates.len(),
            "relieving heap pressure"
        );

        for segment in candidates {
            if stats.heap_size() + 2 < heap_capacity {
                break;
            }
            if self.is_disk_quota_exceeded() {
                return Err(QueueError::DiskQuotaExceeded {
                    max_disk_size: config.max_disk_size,
                    used: stats.disk_bytes(),
                });
            }
            if segment.is_full() {
                let persisted = self.persist_with_timeout(worker, segment)?;
                tracing::debug!(queue = %config.name, persisted, "sweep step");
            }
        }
        Ok(())
    }

    /// Flushes one segment on the worker, waiting at most the persist
    /// timeout. A timeout or a panicking persister counts as nothing
    /// persisted.
    fn persist_with_timeout(
        &self,
        worker: &PersistWorker,
        segment: Arc<Segment<T>>,
    ) -> QueueResult<usize> {
        let timeout = self.ctx.config.persist_timeout;
        match worker.run_with_timeout(timeout, move || segment.persist()) {
            Ok(Some(result)) => result,
            Err(QueueError::JobPanicked { message }) => {
                tracing::warn!(
                    queue = %self.ctx.config.name,
                    panic_message = %message,
                    "segment persist panicked, keeping it in memory"
                );
                Ok(0)
            }
            Err(e) => Err(e),
            Ok(None) => {
                tracing::warn!(
                    queue = %self.ctx.config.name,
                    ?timeout,
                    "timed out waiting for segment persist"
                );
                Ok(0)
            }
        }
    }
}

impl<T> std::fmt::Debug for SpillQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpillQueue")
            .field("name", &self.ctx.config.name)
            .field("len", &self.ctx.stats.total_size())
            .field("segments", &self.segments.lock().len())
            .field("spill_dir", &self.dir.as_ref().map(SpillDir::path))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsSnapshot;
    use spillq_storage::{FaultyPersister, StorageResult};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn config() -> QueueConfig {
        QueueConfig::new("test")
            .capacity(1_000)
            .heap_capacity(30)
            .page_size(10)
    }

    fn open(config: QueueConfig) -> (TempDir, SpillQueue<u32>) {
        let dir = tempdir().unwrap();
        let queue = SpillQueue::open(config.disk_root(dir.path())).unwrap();
        (dir, queue)
    }

    fn drain_all(queue: &SpillQueue<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        queue.drain_into(&mut out, usize::MAX).unwrap();
        out
    }

    fn spill_files(queue: &SpillQueue<u32>) -> usize {
        std::fs::read_dir(queue.spill_dir().unwrap()).unwrap().count()
    }

    #[test]
    fn open_normalizes_config() {
        let dir = tempdir().unwrap();
        let queue: SpillQueue<u32> = SpillQueue::open(
            QueueConfig::new("test")
                .capacity(10)
                .heap_capacity(1_000)
                .page_size(1_000)
                .disk_root(dir.path()),
        )
        .unwrap();

        assert_eq!(queue.config().capacity, 100);
        assert_eq!(queue.config().heap_capacity, 100);
        assert_eq!(queue.config().page_size, 33);
        assert!(queue.spill_dir().unwrap().is_dir());
        assert_eq!(queue.segment_count(), 1);
    }

    #[test]
    fn open_rejects_bad_name() {
        let dir = tempdir().unwrap();
        let result: QueueResult<SpillQueue<u32>> =
            SpillQueue::open(QueueConfig::new("a/b").disk_root(dir.path()));
        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
    }

    #[test]
    fn push_and_drain_in_memory() {
        let (_dir, queue) = open(config());
        for i in 0..25 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 25);
        assert_eq!(queue.segment_count(), 3);

        assert_eq!(drain_all(&queue), (0..25).collect::<Vec<_>>());
        assert!(queue.is_empty());
        assert_eq!(queue.segment_count(), 1);
    }

    #[test]
    fn drain_respects_max_count_across_segments() {
        let (_dir, queue) = open(config());
        for i in 0..25 {
            queue.push(i).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(queue.drain_into(&mut out, 15).unwrap(), 15);
        assert_eq!(out, (0..15).collect::<Vec<_>>());
        assert_eq!(queue.len(), 10);

        assert_eq!(queue.drain_into(&mut out, 100).unwrap(), 10);
        assert_eq!(out, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn heap_pressure_spills_older_segments() {
        let (_dir, queue) = open(config());
        for i in 0..100 {
            queue.push(i).unwrap();
        }

        let stats = queue.stats().snapshot();
        assert!(stats.disk_size > 0);
        assert!(stats.heap_size <= 30);
        assert!(stats.is_consistent());
        assert!(spill_files(&queue) > 0);

        assert_eq!(drain_all(&queue), (0..100).collect::<Vec<_>>());
        let stats = queue.stats().snapshot();
        assert_eq!(stats.disk_files, 0);
        assert_eq!(stats.disk_bytes, 0);
        assert_eq!(spill_files(&queue), 0);
    }

    #[test]
    fn capacity_rejects_without_change() {
        let (_dir, queue) = open(config().capacity(100).heap_capacity(100));
        for i in 0..100 {
            queue.push(i).unwrap();
        }

        let err = queue.push(100).unwrap_err();
        assert!(matches!(err, QueueError::CapacityExceeded { capacity: 100, size: 100 }));
        assert!(!queue.offer(100));
        assert_eq!(queue.len(), 100);
    }

    #[test]
    fn heap_exhausted_without_disk() {
        let (_dir, queue) = open(config().using_disk(false));
        assert!(queue.spill_dir().is_none());

        for i in 0..30 {
            queue.push(i).unwrap();
        }
        let err = queue.push(30).unwrap_err();
        assert!(matches!(err, QueueError::HeapExhausted { heap_capacity: 30, .. }));
        assert_eq!(queue.len(), 30);
        assert_eq!(queue.heap_len(), 30);
    }

    #[test]
    fn write_failures_degrade_to_heap_exhausted() {
        let dir = tempdir().unwrap();
        let persister = Arc::new(FaultyPersister::new(JsonFilePersister::new()));
        persister.set_fail_writes(true);
        let shared: Arc<dyn BatchPersister<u32>> = persister.clone();
        let queue = SpillQueue::with_shared_persister(config().disk_root(dir.path()), shared).unwrap();

        let mut admitted = 0;
        while queue.offer(admitted) {
            admitted += 1;
        }
        assert_eq!(admitted, 30);
        assert!(persister.write_attempts() > 0);

        persister.set_fail_writes(false);
        assert_eq!(drain_all(&queue), (0..30).collect::<Vec<_>>());
    }

    /// Panics on its first write, then writes JSON.
    struct PanicOnce {
        inner: JsonFilePersister,
        armed: AtomicBool,
    }

    impl BatchPersister<u32> for PanicOnce {
        fn write(&self, path: &Path, batch: &[u32]) -> StorageResult<u64> {
            if self.armed.swap(false, Ordering::SeqCst) {
                panic!("encoder blew up");
            }
            self.inner.write(path, batch)
        }

        fn read(&self, path: &Path) -> StorageResult<Vec<u32>> {
            self.inner.read(path)
        }
    }

    #[test]
    fn panicking_persister_does_not_stop_spilling() {
        let dir = tempdir().unwrap();
        let persister = PanicOnce {
            inner: JsonFilePersister::new(),
            armed: AtomicBool::new(true),
        };
        let queue = SpillQueue::with_persister(config().disk_root(dir.path()), persister).unwrap();

        let mut admitted = Vec::new();
        for i in 0..200 {
            match queue.push(i) {
                Ok(()) => admitted.push(i),
                Err(e) => assert!(e.is_rejection(), "push {i} failed: {e}"),
            }
        }

        let snap = queue.stats().snapshot();
        assert!(snap.persisted_files > 0, "queue stopped spilling");
        assert!(snap.is_consistent());
        assert!(admitted.len() > 100);
        assert_eq!(drain_all(&queue), admitted);
    }

    #[test]
    fn clear_resets_everything() {
        let (_dir, queue) = open(config());
        for i in 0..100 {
            queue.push(i).unwrap();
        }
        assert!(spill_files(&queue) > 0);

        queue.clear();

        assert_eq!(queue.stats().snapshot(), StatsSnapshot::default());
        assert_eq!(spill_files(&queue), 0);
        assert_eq!(queue.segment_count(), 0);
        assert!(drain_all(&queue).is_empty());

        queue.push(7).unwrap();
        assert_eq!(queue.segment_count(), 1);
        assert_eq!(drain_all(&queue), vec![7]);
    }

    #[test]
    fn missing_spill_file_is_corruption() {
        let (_dir, queue) = open(config());
        for i in 0..100 {
            queue.push(i).unwrap();
        }
        for entry in std::fs::read_dir(queue.spill_dir().unwrap()).unwrap() {
            std::fs::remove_file(entry.unwrap().path()).unwrap();
        }

        let mut out = Vec::new();
        let err = queue.drain_into(&mut out, usize::MAX).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn partial_drain_reports_delivered_count() {
        let (_dir, queue) = open(config());
        for i in 0..100 {
            queue.push(i).unwrap();
        }

        // The oldest segment stays resident; spilled ones follow it in id order.
        let mut files: Vec<_> = std::fs::read_dir(queue.spill_dir().unwrap())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(files.len() >= 2);
        files.sort_by_key(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
        });

        let mut out = Vec::new();
        queue.drain_into(&mut out, 10).unwrap();
        std::fs::remove_file(&files[1]).unwrap();

        match queue.drain_into(&mut out, usize::MAX) {
            Err(QueueError::PartialDrain { drained, source }) => {
                assert_eq!(drained, 10);
                assert!(source.is_corruption());
            }
            other => panic!("expected a partial drain, got {other:?}"),
        }
        assert_eq!(out, (0..20).collect::<Vec<_>>());
        assert_eq!(queue.len(), 80);
        assert!(queue.stats().snapshot().is_consistent());
    }

    #[test]
    fn monitor_runs_alongside_queue() {
        let (_dir, queue) = open(
            config().monitor_interval(Some(Duration::from_millis(5))),
        );
        for i in 0..50 {
            queue.push(i).unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert!(queue.summary().contains("size=50"));
    }

    #[test]
    fn monitor_starts_by_default() {
        let (_dir, queue) = open(config());
        assert!(queue.monitor.is_some());

        let (_dir, quiet) = open(config().monitor_interval(None));
        assert!(quiet.monitor.is_none());
    }

    #[test]
    fn summary_combines_config_and_stats() {
        let (_dir, queue) = open(config());
        queue.push(1).unwrap();
        let summary = queue.summary();
        assert!(summary.starts_with("capacity=1000, heap_capacity=30"));
        assert!(summary.contains("size=1, heap=1, disk=0"));
    }
}
