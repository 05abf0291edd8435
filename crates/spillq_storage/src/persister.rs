//! Batch persister trait definition.

use crate::error::StorageResult;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Extension used for spill files by the bundled persisters.
pub const SPILL_FILE_EXTENSION: &str = "dat";

/// Writes and reads an ordered batch of elements to and from a single file.
///
/// Persisters are the serialization boundary of a spilling queue. The queue
/// decides *when* and *where* a batch goes to disk; the persister only
/// decides *how* it is encoded.
///
/// # Invariants
///
/// - `read` returns exactly the elements passed to `write`, in the same order
/// - `write` returns the size in bytes of the file it produced
/// - A failed `write` leaves no file behind (best effort)
/// - Persisters must be `Send + Sync`; one instance serves every segment
///
/// # Implementors
///
/// - [`super::JsonFilePersister`] - Default, one JSON array per file
/// - [`super::CborFilePersister`] - Compact CBOR encoding
/// - [`super::FaultyPersister`] - Failure injection wrapper for tests
pub trait BatchPersister<T>: Send + Sync {
    /// Writes `batch` to a fresh file at `path`.
    ///
    /// Any stale file at `path` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, the batch cannot be
    /// encoded, or an I/O error occurs while writing.
    fn write(&self, path: &Path, batch: &[T]) -> StorageResult<u64>;

    /// Reads back the batch stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or malformed.
    fn read(&self, path: &Path) -> StorageResult<Vec<T>>;

    /// Returns the file extension for files produced by this persister.
    fn extension(&self) -> &'static str {
        SPILL_FILE_EXTENSION
    }
}

/// Creates `path` exclusively, runs `encode` against a buffered writer and
/// returns the resulting file length.
///
/// A stale file at `path` is removed first. If anything fails, the partial
/// file is removed before the error is returned.
pub(crate) fn write_file<F>(path: &Path, encode: F) -> StorageResult<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> StorageResult<()>,
{
    remove_quietly(path);

    let result = (|| -> StorageResult<u64> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = BufWriter::new(file);
        encode(&mut writer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        Ok(file.metadata()?.len())
    })();

    if result.is_err() {
        remove_quietly(path);
    }
    result
}

/// Removes a file, ignoring any error.
pub(crate) fn remove_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}
