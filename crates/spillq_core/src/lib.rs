//! # spillq Core
//!
//! A bounded FIFO queue that spills to disk.
//!
//! This crate provides:
//! - [`SpillQueue`], an ordered list of page-sized segments with capacity,
//!   heap and disk-quota admission
//! - Background flushing of older full segments under heap pressure, with a
//!   per-flush timeout
//! - Transparent reload of spilled segments on drain, preserving order
//! - [`QueueStats`] counters shared with external monitors
//!
//! ## Example
//!
//! ```rust
//! use spillq_core::{QueueConfig, SpillQueue};
//!
//! let root = tempfile::tempdir().unwrap();
//! let config = QueueConfig::new("doc")
//!     .capacity(1_000)
//!     .heap_capacity(30)
//!     .page_size(10)
//!     .disk_root(root.path());
//! let queue: SpillQueue<u64> = SpillQueue::open(config).unwrap();
//!
//! for i in 0..100 {
//!     queue.push(i).unwrap();
//! }
//! assert!(queue.stats().disk_size() > 0);
//!
//! let mut out = Vec::new();
//! queue.drain_into(&mut out, 100).unwrap();
//! assert_eq!(out, (0..100).collect::<Vec<_>>());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod dir;
mod error;
mod monitor;
mod queue;
mod segment;
mod stats;
mod worker;

pub use config::{QueueConfig, DEFAULT_MAX_DISK_SIZE, DEFAULT_MONITOR_INTERVAL, MIN_CAPACITY};
pub use error::{QueueError, QueueResult};
pub use queue::SpillQueue;
pub use stats::{format_bytes, QueueStats, StatsSnapshot};

pub use spillq_storage::{
    BatchPersister, CborFilePersister, FaultyPersister, JsonFilePersister, StorageError,
    StorageResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
