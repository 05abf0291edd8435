//! Benchmark utilities for spillq.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use serde::{Deserialize, Serialize};
use spillq_core::{QueueConfig, SpillQueue};
use tempfile::TempDir;

/// A benchmark element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Sequence number.
    pub id: u64,
    /// Random payload.
    pub data: Vec<u8>,
}

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` records with payloads of `payload_size` bytes.
pub fn generate_records(count: usize, payload_size: usize) -> Vec<Record> {
    (0..count as u64)
        .map(|id| Record {
            id,
            data: random_data(payload_size),
        })
        .collect()
}

/// Opens a queue under a fresh temporary directory.
///
/// The directory must outlive the queue.
pub fn temp_queue(config: QueueConfig) -> (TempDir, SpillQueue<Record>) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let queue = SpillQueue::open(config.disk_root(dir.path())).expect("Failed to open queue");
    (dir, queue)
}
