//! Queue configuration.

use crate::error::{QueueError, QueueResult};
use crate::stats::format_bytes;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest total capacity a queue accepts; lower values are raised to it.
pub const MIN_CAPACITY: usize = 100;

/// Default maximum disk size: 5 GiB.
pub const DEFAULT_MAX_DISK_SIZE: u64 = 5120 * MIB;

/// Default interval between monitor log lines.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

const MIB: u64 = 1024 * 1024;

/// Configuration for opening a queue.
///
/// Values are taken as given by the builder methods; [`QueueConfig::normalized`]
/// applies the clamps the queue relies on, and the queue always normalizes
/// before use.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Logical name; also the spill directory name under `disk_root`.
    pub name: String,

    /// Maximum number of elements held by the queue.
    pub capacity: usize,

    /// Maximum number of elements resident in memory across all segments.
    pub heap_capacity: usize,

    /// Maximum bytes occupied by spill files.
    pub max_disk_size: u64,

    /// Maximum number of elements per segment.
    pub page_size: usize,

    /// Whether full segments may be spilled to disk.
    pub using_disk: bool,

    /// How long an enqueue waits for one segment to be persisted.
    pub persist_timeout: Duration,

    /// Directory under which the queue's spill directory is created.
    pub disk_root: PathBuf,

    /// How often to log configuration and counters (`None` = never).
    ///
    /// Defaults to [`DEFAULT_MONITOR_INTERVAL`].
    pub monitor_interval: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "spillq".to_string(),
            capacity: 500_000,
            heap_capacity: 15_000,
            max_disk_size: DEFAULT_MAX_DISK_SIZE,
            page_size: 1_000,
            using_disk: true,
            persist_timeout: Duration::from_secs(10),
            disk_root: std::env::temp_dir().join("spillq"),
            monitor_interval: Some(DEFAULT_MONITOR_INTERVAL),
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with default values and the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the total capacity.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the heap capacity.
    #[must_use]
    pub const fn heap_capacity(mut self, heap_capacity: usize) -> Self {
        self.heap_capacity = heap_capacity;
        self
    }

    /// Sets the maximum disk size in bytes.
    #[must_use]
    pub const fn max_disk_size(mut self, bytes: u64) -> Self {
        self.max_disk_size = bytes;
        self
    }

    /// Sets the maximum disk size in MiB. Zero keeps the default.
    #[must_use]
    pub const fn max_disk_size_mb(mut self, mb: u64) -> Self {
        self.max_disk_size = if mb == 0 {
            DEFAULT_MAX_DISK_SIZE
        } else {
            mb.saturating_mul(MIB)
        };
        self
    }

    /// Sets the page (segment) size.
    #[must_use]
    pub const fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets whether segments may be spilled to disk.
    #[must_use]
    pub const fn using_disk(mut self, value: bool) -> Self {
        self.using_disk = value;
        self
    }

    /// Sets the persist timeout.
    #[must_use]
    pub const fn persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Sets the directory under which the spill directory is created.
    #[must_use]
    pub fn disk_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.disk_root = root.into();
        self
    }

    /// Sets the monitor interval.
    #[must_use]
    pub const fn monitor_interval(mut self, interval: Option<Duration>) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Returns the spill directory for this queue.
    #[must_use]
    pub fn spill_dir(&self) -> PathBuf {
        self.disk_root.join(&self.name)
    }

    /// Applies the capacity clamps.
    ///
    /// - capacity is at least [`MIN_CAPACITY`]
    /// - heap capacity is at most capacity
    /// - zero max disk size means [`DEFAULT_MAX_DISK_SIZE`]
    /// - page size is at most a third of the heap capacity, and at least 1
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.capacity = self.capacity.max(MIN_CAPACITY);
        self.heap_capacity = self.heap_capacity.min(self.capacity);
        if self.max_disk_size == 0 {
            self.max_disk_size = DEFAULT_MAX_DISK_SIZE;
        }
        self.page_size = self.page_size.min(self.heap_capacity / 3).max(1);
        self
    }

    /// Checks that the configuration can name a spill directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty, contains a path
    /// separator, or is a relative path component.
    pub fn validate(&self) -> QueueResult<()> {
        if self.name.is_empty() {
            return Err(QueueError::invalid_argument("queue name must not be empty"));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(QueueError::invalid_argument(format!(
                "queue name must be a plain directory name: {:?}",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity={}, heap_capacity={}, max_disk_size={}, page_size={}, using_disk={}, persist_timeout={:?}",
            self.capacity,
            self.heap_capacity,
            format_bytes(self.max_disk_size),
            self.page_size,
            self.using_disk,
            self.persist_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 500_000);
        assert_eq!(config.heap_capacity, 15_000);
        assert_eq!(config.page_size, 1_000);
        assert!(config.using_disk);
        assert_eq!(config.persist_timeout, Duration::from_secs(10));
        assert_eq!(config.monitor_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn builder_pattern() {
        let config = QueueConfig::new("orders")
            .capacity(10_000)
            .heap_capacity(3_000)
            .page_size(1_000)
            .persist_timeout(Duration::from_secs(15))
            .disk_root("/tmp/queues");

        assert_eq!(config.name, "orders");
        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.heap_capacity, 3_000);
        assert_eq!(config.page_size, 1_000);
        assert_eq!(config.persist_timeout, Duration::from_secs(15));
        assert_eq!(config.spill_dir(), PathBuf::from("/tmp/queues/orders"));
    }

    #[test]
    fn normalized_clamps() {
        let config = QueueConfig::new("q")
            .capacity(10)
            .heap_capacity(500)
            .page_size(400)
            .max_disk_size(0)
            .normalized();

        assert_eq!(config.capacity, MIN_CAPACITY);
        assert_eq!(config.heap_capacity, MIN_CAPACITY);
        assert_eq!(config.page_size, MIN_CAPACITY / 3);
        assert_eq!(config.max_disk_size, DEFAULT_MAX_DISK_SIZE);
    }

    #[test]
    fn normalized_keeps_sane_values() {
        let config = QueueConfig::new("q")
            .capacity(10_000)
            .heap_capacity(3_000)
            .page_size(1_000)
            .normalized();

        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.heap_capacity, 3_000);
        assert_eq!(config.page_size, 1_000);
    }

    #[test]
    fn page_size_never_zero() {
        let config = QueueConfig::new("q").heap_capacity(2).page_size(10).normalized();
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn max_disk_size_in_mb() {
        assert_eq!(QueueConfig::new("q").max_disk_size_mb(1).max_disk_size, MIB);
        assert_eq!(
            QueueConfig::new("q").max_disk_size_mb(0).max_disk_size,
            DEFAULT_MAX_DISK_SIZE
        );
    }

    #[test]
    fn validate_names() {
        assert!(QueueConfig::new("events").validate().is_ok());
        assert!(QueueConfig::new("").validate().is_err());
        assert!(QueueConfig::new("a/b").validate().is_err());
        assert!(QueueConfig::new("..").validate().is_err());
    }

    #[test]
    fn display_lists_limits() {
        let text = QueueConfig::new("q").capacity(100).to_string();
        assert!(text.starts_with("capacity=100, heap_capacity=15000"));
        assert!(text.contains("max_disk_size=5.00G"));
    }
}
