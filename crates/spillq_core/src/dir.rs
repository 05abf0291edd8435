//! Spill directory management.
//!
//! Each queue owns one directory of spill files:
//!
//! ```text
//! <disk_root>/
//! ├─ <name>.lock       # Advisory lock, held while the queue is alive
//! └─ <name>/
//!    ├─ 17.dat         # One file per persisted segment, named by segment id
//!    └─ 23.dat
//! ```
//!
//! The directory is wiped and recreated when a queue opens; spill files do
//! not survive the queue that wrote them. The lock file sits beside the
//! directory so a cleared queue leaves its directory empty.

use crate::error::{QueueError, QueueResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// An exclusively owned, freshly emptied spill directory.
#[derive(Debug)]
pub(crate) struct SpillDir {
    /// Absolute path of the spill directory.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl SpillDir {
    /// Locks and recreates `<root>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another live queue holds the lock (`DirectoryLocked`)
    /// - The directory cannot be removed or created
    pub(crate) fn open(root: &Path, name: &str) -> QueueResult<Self> {
        fs::create_dir_all(root)?;

        let path = root.join(name);
        let lock_path = root.join(format!("{name}.lock"));
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(QueueError::DirectoryLocked { path });
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&path)?;
        let path = path.canonicalize()?;

        tracing::info!(path = %path.display(), "spill directory ready");

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Returns the spill directory.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
