//! State shared by a queue and every segment it creates.

use crate::config::QueueConfig;
use crate::stats::QueueStats;
use spillq_storage::BatchPersister;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-queue context handed to each segment.
pub(crate) struct QueueContext<T> {
    /// Normalized configuration.
    pub(crate) config: QueueConfig,
    /// Counters shared with monitors.
    pub(crate) stats: Arc<QueueStats>,
    /// Encoder for spill files.
    pub(crate) persister: Arc<dyn BatchPersister<T>>,
    /// Directory holding spill files.
    pub(crate) spill_dir: PathBuf,
    /// Last segment id handed out.
    last_segment_id: AtomicU64,
}

impl<T> QueueContext<T> {
    pub(crate) fn new(
        config: QueueConfig,
        stats: Arc<QueueStats>,
        persister: Arc<dyn BatchPersister<T>>,
        spill_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            stats,
            persister,
            spill_dir,
            last_segment_id: AtomicU64::new(0),
        }
    }

    /// Returns a segment id never handed out before by this queue.
    pub(crate) fn next_segment_id(&self) -> u64 {
        self.last_segment_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the spill file path for a segment id.
    pub(crate) fn segment_path(&self, segment_id: u64) -> PathBuf {
        self.spill_dir
            .join(format!("{segment_id}.{}", self.persister.extension()))
    }
}
