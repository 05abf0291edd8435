//! Test fixtures and queue helpers.
//!
//! Every fixture roots its queue in a fresh temporary directory that lives
//! as long as the fixture.

use spillq_core::{BatchPersister, QueueConfig, QueueResult, SpillQueue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A queue rooted in a temporary directory.
pub struct TestQueue<T> {
    /// The queue instance.
    pub queue: SpillQueue<T>,
    // Dropped after the queue so its files go last.
    temp_dir: TempDir,
}

impl<T> TestQueue<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
{
    /// Opens a JSON-spilling queue under a new temporary directory.
    ///
    /// `config.disk_root` is replaced.
    pub fn new(config: QueueConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let queue = SpillQueue::open(config.disk_root(temp_dir.path()))
            .expect("Failed to open test queue");
        Self { queue, temp_dir }
    }
}

impl<T: Send + 'static> TestQueue<T> {
    /// Opens a queue spilling through `persister` under a new temporary
    /// directory.
    pub fn with_persister(config: QueueConfig, persister: Arc<dyn BatchPersister<T>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let queue = SpillQueue::with_shared_persister(config.disk_root(temp_dir.path()), persister)
            .expect("Failed to open test queue");
        Self { queue, temp_dir }
    }

    /// Returns the temporary root directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the spill files currently on disk, sorted by segment id.
    pub fn spill_files(&self) -> Vec<PathBuf> {
        self.queue.spill_dir().map(spill_files).unwrap_or_default()
    }
}

impl<T> std::ops::Deref for TestQueue<T> {
    type Target = SpillQueue<T>;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}

/// Lists the spill files in `dir`, sorted by segment id.
pub fn spill_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort_by_key(|p| segment_id_of(p));
    files
}

/// Parses the segment id out of a spill file name.
pub fn segment_id_of(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

/// A small queue shape that spills after a few dozen elements.
///
/// Capacity 1 000, heap capacity 30, page size 10.
pub fn small_config(name: &str) -> QueueConfig {
    QueueConfig::new(name)
        .capacity(1_000)
        .heap_capacity(30)
        .page_size(10)
}

/// Runs `f` with a temporary JSON-spilling queue.
pub fn with_temp_queue<T, F, R>(config: QueueConfig, f: F) -> R
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    F: FnOnce(&SpillQueue<T>) -> R,
{
    let test_queue = TestQueue::new(config);
    f(&test_queue.queue)
}

/// Drains everything currently in `queue`.
pub fn drain_all<T: Send + 'static>(queue: &SpillQueue<T>) -> Vec<T> {
    try_drain_all(queue).expect("Failed to drain queue")
}

/// Drains everything currently in `queue`, returning any error.
pub fn try_drain_all<T: Send + 'static>(queue: &SpillQueue<T>) -> QueueResult<Vec<T>> {
    let mut out = Vec::new();
    queue.drain_into(&mut out, usize::MAX)?;
    Ok(out)
}

/// Pushes every element, panicking on the first rejection.
pub fn push_all<T, I>(queue: &SpillQueue<T>, elements: I)
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    for element in elements {
        queue.push(element).expect("Failed to push element");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_roots_in_temp_dir() {
        let queue: TestQueue<u32> = TestQueue::new(small_config("fixture"));
        let spill_dir = queue.spill_dir().unwrap().to_path_buf();

        assert!(spill_dir.starts_with(queue.root().canonicalize().unwrap()));
        assert!(queue.spill_files().is_empty());
    }

    #[test]
    fn spill_files_sorted_by_id() {
        let queue: TestQueue<u32> = TestQueue::new(small_config("fixture"));
        push_all(&queue, 0..100);

        let ids: Vec<_> = queue
            .spill_files()
            .iter()
            .map(|p| segment_id_of(p).unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert!(!ids.is_empty());
        assert_eq!(ids, sorted);
    }

    #[test]
    fn with_temp_queue_runs_closure() {
        let drained = with_temp_queue(small_config("fixture"), |queue: &SpillQueue<u32>| {
            push_all(queue, 0..5);
            drain_all(queue)
        });
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }
}
