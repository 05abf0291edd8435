//! Queue counters.
//!
//! Every counter is an independent atomic. Updates that must stay paired
//! (heap to disk, persisted to loaded) are applied by one method each so
//! the invariants below hold between calls:
//!
//! - `total_size == heap_size + disk_size`
//! - `disk_files == persisted_files - loaded_files`
//!
//! The two halves of a pair are separate atomic operations, so a reader
//! racing with an update may observe one half without the other. Nothing in
//! the queue depends on strict simultaneity.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Element and disk counters for one queue instance.
///
/// Shared by the queue and all of its segments.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Elements held by the queue.
    total_size: AtomicI64,
    /// Elements resident in memory.
    heap_size: AtomicI64,
    /// Elements resident in spill files.
    disk_size: AtomicI64,
    /// Spill files currently on disk.
    disk_files: AtomicI64,
    /// Spill files ever written.
    persisted_files: AtomicU64,
    /// Spill files ever retired (read back or discarded).
    loaded_files: AtomicU64,
    /// Bytes occupied by spill files.
    disk_bytes: AtomicI64,
}

impl QueueStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    // === Paired updates (crate use) ===

    /// Adds `delta` elements to the queue; they start heap-resident.
    pub(crate) fn add_total(&self, delta: i64) {
        self.total_size.fetch_add(delta, Ordering::SeqCst);
        self.heap_size.fetch_add(delta, Ordering::SeqCst);
    }

    /// Moves `delta` elements from heap to disk (negative moves them back).
    pub(crate) fn move_to_disk(&self, delta: i64) {
        self.disk_size.fetch_add(delta, Ordering::SeqCst);
        self.heap_size.fetch_sub(delta, Ordering::SeqCst);
    }

    /// Records spill files written.
    pub(crate) fn add_persisted_files(&self, count: u64) {
        self.persisted_files.fetch_add(count, Ordering::SeqCst);
        self.disk_files.fetch_add(count as i64, Ordering::SeqCst);
    }

    /// Records spill files retired from disk.
    pub(crate) fn add_loaded_files(&self, count: u64) {
        self.loaded_files.fetch_add(count, Ordering::SeqCst);
        self.disk_files.fetch_sub(count as i64, Ordering::SeqCst);
    }

    /// Adjusts the bytes used by spill files.
    pub(crate) fn add_disk_bytes(&self, delta: i64) {
        self.disk_bytes.fetch_add(delta, Ordering::SeqCst);
    }

    /// Zeroes the cumulative file counters.
    ///
    /// Only valid while no spill file exists, so `disk_files` stays in step.
    pub(crate) fn reset_file_history(&self) {
        self.persisted_files.store(0, Ordering::SeqCst);
        self.loaded_files.store(0, Ordering::SeqCst);
        self.disk_files.store(0, Ordering::SeqCst);
    }

    // === Getters (public API) ===

    /// Returns the number of elements held by the queue.
    pub fn total_size(&self) -> i64 {
        self.total_size.load(Ordering::SeqCst)
    }

    /// Returns the number of heap-resident elements.
    pub fn heap_size(&self) -> i64 {
        self.heap_size.load(Ordering::SeqCst)
    }

    /// Returns the number of disk-resident elements.
    pub fn disk_size(&self) -> i64 {
        self.disk_size.load(Ordering::SeqCst)
    }

    /// Returns the number of spill files on disk.
    pub fn disk_files(&self) -> i64 {
        self.disk_files.load(Ordering::SeqCst)
    }

    /// Returns the number of spill files ever written.
    pub fn persisted_files(&self) -> u64 {
        self.persisted_files.load(Ordering::SeqCst)
    }

    /// Returns the number of spill files ever retired.
    pub fn loaded_files(&self) -> u64 {
        self.loaded_files.load(Ordering::SeqCst)
    }

    /// Returns the bytes used by spill files.
    pub fn disk_bytes(&self) -> u64 {
        self.disk_bytes.load(Ordering::SeqCst).max(0) as u64
    }

    /// Returns the average encoded size of a disk-resident element.
    ///
    /// Zero when nothing is on disk.
    pub fn per_element_disk_size(&self) -> u64 {
        let disk_size = self.disk_size();
        if disk_size < 1 {
            0
        } else {
            self.disk_bytes() / disk_size as u64
        }
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_size: self.total_size(),
            heap_size: self.heap_size(),
            disk_size: self.disk_size(),
            disk_files: self.disk_files(),
            persisted_files: self.persisted_files(),
            loaded_files: self.loaded_files(),
            disk_bytes: self.disk_bytes(),
        }
    }
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={}, heap={}, disk={}, files={}, persisted={}, loaded={}, disk_used={}, per_element={}",
            self.total_size(),
            self.heap_size(),
            self.disk_size(),
            self.disk_files(),
            self.persisted_files(),
            self.loaded_files(),
            format_bytes(self.disk_bytes()),
            format_bytes(self.per_element_disk_size()),
        )
    }
}

/// A point-in-time copy of [`QueueStats`].
///
/// Fields are read one at a time, so a snapshot taken under concurrent
/// updates may catch a pair half-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Elements held by the queue.
    pub total_size: i64,
    /// Heap-resident elements.
    pub heap_size: i64,
    /// Disk-resident elements.
    pub disk_size: i64,
    /// Spill files on disk.
    pub disk_files: i64,
    /// Spill files ever written.
    pub persisted_files: u64,
    /// Spill files ever retired.
    pub loaded_files: u64,
    /// Bytes used by spill files.
    pub disk_bytes: u64,
}

impl StatsSnapshot {
    /// Returns true if both counter invariants hold in this snapshot.
    pub fn is_consistent(&self) -> bool {
        self.total_size == self.heap_size + self.disk_size
            && self.disk_files == self.persisted_files as i64 - self.loaded_files as i64
    }
}

/// Formats a byte count as `B`, `K`, `M` or `G` with two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes < KIB {
        format!("{:.2}B", bytes as f64)
    } else if bytes < MIB {
        format!("{:.2}K", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.2}M", bytes as f64 / MIB as f64)
    } else {
        format!("{:.2}G", bytes as f64 / GIB as f64)
    }
}
