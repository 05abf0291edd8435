//! JSON file persister, the default spill format.

use crate::error::{StorageError, StorageResult};
use crate::persister::{write_file, BatchPersister};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Persists each batch as a single JSON array document.
///
/// The format is self-describing, so spill files can be inspected with any
/// JSON tool. Unknown fields on elements are ignored when reading back.
///
/// # Example
///
/// ```no_run
/// use spillq_storage::{BatchPersister, JsonFilePersister};
/// use std::path::Path;
///
/// let persister = JsonFilePersister::new();
/// let path = Path::new("1.dat");
/// persister.write(path, &[1, 2, 3]).unwrap();
/// let batch: Vec<i32> = persister.read(path).unwrap();
/// assert_eq!(batch, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFilePersister {
    pretty: bool,
}

impl JsonFilePersister {
    /// Creates a persister writing compact JSON.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Creates a persister writing indented JSON.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<T> BatchPersister<T> for JsonFilePersister
where
    T: Serialize + DeserializeOwned,
{
    fn write(&self, path: &Path, batch: &[T]) -> StorageResult<u64> {
        write_file(path, |writer| {
            let encoded = if self.pretty {
                serde_json::to_writer_pretty(writer, batch)
            } else {
                serde_json::to_writer(writer, batch)
            };
            encoded.map_err(|e| {
                if e.is_io() {
                    StorageError::Io(e.into())
                } else {
                    StorageError::encode(e.to_string())
                }
            })
        })
    }

    fn read(&self, path: &Path) -> StorageResult<Vec<T>> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                StorageError::Io(e.into())
            } else {
                StorageError::decode(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Event {
        id: u32,
        name: String,
    }

    #[test]
    fn write_and_read_integers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("text.dat");
        let batch: Vec<i32> = (0..30).collect();

        let persister = JsonFilePersister::new();
        let bytes = persister.write(&path, &batch).unwrap();
        assert_eq!(bytes, fs::metadata(&path).unwrap().len());

        let read: Vec<i32> = persister.read(&path).unwrap();
        assert_eq!(read, batch);
    }

    #[test]
    fn write_and_read_structs_pretty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.dat");
        let batch = vec![
            Event {
                id: 1,
                name: "first".into(),
            },
            Event {
                id: 2,
                name: "second".into(),
            },
        ];

        let persister = JsonFilePersister::pretty();
        persister.write(&path, &batch).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains('\n'));

        let read: Vec<Event> = persister.read(&path).unwrap();
        assert_eq!(read, batch);
    }

    #[test]
    fn write_replaces_stale_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stale.dat");
        fs::write(&path, "leftover from an earlier run").unwrap();

        let persister = JsonFilePersister::new();
        persister.write(&path, &[7u8, 8, 9]).unwrap();

        let read: Vec<u8> = persister.read(&path).unwrap();
        assert_eq!(read, vec![7, 8, 9]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extra.dat");
        fs::write(&path, r#"[{"id":3,"name":"x","added_later":true}]"#).unwrap();

        let read: Vec<Event> = JsonFilePersister::new().read(&path).unwrap();
        assert_eq!(
            read,
            vec![Event {
                id: 3,
                name: "x".into()
            }]
        );
    }

    #[test]
    fn malformed_file_fails_to_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("text.dat");
        fs::write(&path, "wrong value").unwrap();

        let result: StorageResult<Vec<i32>> = JsonFilePersister::new().read(&path);
        assert!(matches!(result, Err(StorageError::Decode { .. })));
    }

    #[test]
    fn missing_file_fails_to_read() {
        let dir = tempdir().unwrap();
        let result: StorageResult<Vec<i32>> =
            JsonFilePersister::new().read(&dir.path().join("absent.dat"));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrong").join("test.dat");

        let result = JsonFilePersister::new().write(&path, &[1, 2, 3]);
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!path.exists());
    }
}
