//! Error types for spillq core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur in queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Persister error outside of a reload.
    #[error("storage error: {0}")]
    Storage(#[from] spillq_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An argument or configuration value is unusable.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The queue already holds `capacity` elements.
    #[error("queue full: capacity {capacity}, size {size}")]
    CapacityExceeded {
        /// Configured total capacity.
        capacity: usize,
        /// Size observed when the element was rejected.
        size: usize,
    },

    /// Spill files already occupy the configured disk quota.
    #[error("disk quota exceeded: max {max_disk_size} bytes, used {used} bytes")]
    DiskQuotaExceeded {
        /// Configured maximum disk size in bytes.
        max_disk_size: u64,
        /// Bytes used by spill files.
        used: u64,
    },

    /// Heap pressure could not be relieved by persisting segments.
    #[error("heap exhausted: heap capacity {heap_capacity}, heap size {heap_size}")]
    HeapExhausted {
        /// Configured heap capacity.
        heap_capacity: usize,
        /// Heap-resident elements after the persistence sweep.
        heap_size: i64,
    },

    /// A segment is marked persisted but its file is gone.
    #[error("segment {segment_id} corrupted: {message}")]
    SegmentCorruption {
        /// Id of the segment.
        segment_id: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A persisted segment could not be read back.
    #[error("failed to reload segment {segment_id}: {source}")]
    Reload {
        /// Id of the segment.
        segment_id: u64,
        /// The persister error.
        source: spillq_storage::StorageError,
    },

    /// A drain failed after delivering part of its result.
    #[error("drain failed after {drained} elements: {source}")]
    PartialDrain {
        /// Elements moved into the sink before the failure.
        drained: usize,
        /// The failure that stopped the drain.
        source: Box<QueueError>,
    },

    /// Another live queue owns the spill directory.
    #[error("spill directory locked by another queue: {}", .path.display())]
    DirectoryLocked {
        /// The spill directory.
        path: PathBuf,
    },

    /// The persist worker thread has stopped.
    #[error("persist worker stopped")]
    WorkerStopped,

    /// A job on the persist worker panicked. The worker keeps running.
    #[error("persist job panicked: {message}")]
    JobPanicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl QueueError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a segment corruption error.
    pub fn segment_corruption(segment_id: u64, message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            segment_id,
            message: message.into(),
        }
    }

    /// Returns true for admission rejections.
    ///
    /// A rejected element was never enqueued and the queue is unchanged.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. }
                | Self::DiskQuotaExceeded { .. }
                | Self::HeapExhausted { .. }
        )
    }

    /// Returns true when persisted data could not be brought back.
    ///
    /// Such errors are never retried; the surrounding application should
    /// treat the queue as degraded.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::SegmentCorruption { .. } | Self::Reload { .. } => true,
            Self::PartialDrain { source, .. } => source.is_corruption(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_classification() {
        assert!(QueueError::CapacityExceeded {
            capacity: 100,
            size: 100
        }
        .is_rejection());
        assert!(QueueError::DiskQuotaExceeded {
            max_disk_size: 1,
            used: 2
        }
        .is_rejection());
        assert!(!QueueError::WorkerStopped.is_rejection());
        assert!(!QueueError::JobPanicked {
            message: "boom".into()
        }
        .is_rejection());
    }

    #[test]
    fn corruption_seen_through_partial_drain() {
        let err = QueueError::PartialDrain {
            drained: 5,
            source: Box::new(QueueError::segment_corruption(7, "file missing")),
        };
        assert!(err.is_corruption());
        assert!(!err.is_rejection());
        assert_eq!(
            err.to_string(),
            "drain failed after 5 elements: segment 7 corrupted: file missing"
        );
    }
}
