//! Inspect command implementation.

use super::{CliError, CliResult, Codec};
use serde::Serialize;
use spillq_core::format_bytes;
use spillq_storage::{BatchPersister, CborFilePersister, JsonFilePersister, SPILL_FILE_EXTENSION};
use std::fs;
use std::path::Path;

/// Spill directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Spill directory path.
    pub path: String,
    /// Number of spill files.
    pub file_count: usize,
    /// Total bytes in spill files.
    pub total_bytes: u64,
    /// Total elements decoded.
    pub total_elements: usize,
    /// Per-file details, sorted by segment id.
    pub files: Vec<SpillFileInfo>,
}

/// Details of one spill file.
#[derive(Debug, Serialize)]
pub struct SpillFileInfo {
    /// Segment id from the file name.
    pub segment_id: u64,
    /// File size in bytes.
    pub bytes: u64,
    /// Number of elements, if the file decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<usize>,
    /// Decode error, if the file did not decode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the inspect command.
pub fn run(dir: &Path, codec: Codec, format: &str) -> CliResult<()> {
    let result = inspect(dir, codec)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Scans `dir` for spill files and decodes each one as generic values.
pub fn inspect(dir: &Path, codec: Codec) -> CliResult<InspectResult> {
    if !dir.is_dir() {
        return Err(CliError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SPILL_FILE_EXTENSION) {
            continue;
        }
        let Some(segment_id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        else {
            continue;
        };

        let bytes = fs::metadata(&path)?.len();
        let (elements, error) = match decode(&path, codec) {
            Ok(batch) => (Some(batch.len()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        files.push(SpillFileInfo {
            segment_id,
            bytes,
            elements,
            error,
        });
    }
    files.sort_by_key(|f| f.segment_id);

    Ok(InspectResult {
        path: dir.display().to_string(),
        file_count: files.len(),
        total_bytes: files.iter().map(|f| f.bytes).sum(),
        total_elements: files.iter().filter_map(|f| f.elements).sum(),
        files,
    })
}

fn decode(path: &Path, codec: Codec) -> spillq_storage::StorageResult<Vec<serde_json::Value>> {
    match codec {
        Codec::Json => JsonFilePersister::new().read(path),
        Codec::Cbor => CborFilePersister::new().read(path),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Spill directory: {}", result.path);
    println!("Files:    {}", result.file_count);
    println!("Bytes:    {}", format_bytes(result.total_bytes));
    println!("Elements: {}", result.total_elements);

    if result.files.is_empty() {
        return;
    }
    println!();
    println!("{:>12}  {:>10}  {:>9}", "segment", "bytes", "elements");
    for file in &result.files {
        match (&file.elements, &file.error) {
            (Some(n), _) => println!("{:>12}  {:>10}  {:>9}", file.segment_id, file.bytes, n),
            (None, Some(e)) => {
                println!("{:>12}  {:>10}  unreadable: {}", file.segment_id, file.bytes, e)
            }
            (None, None) => println!("{:>12}  {:>10}", file.segment_id, file.bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let persister = JsonFilePersister::new();
        persister.write(&dir.path().join("12.dat"), &[1, 2, 3]).unwrap();
        persister.write(&dir.path().join("3.dat"), &[4]).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = inspect(dir.path(), Codec::Json).unwrap();

        assert_eq!(result.file_count, 2);
        assert_eq!(result.total_elements, 4);
        let ids: Vec<_> = result.files.iter().map(|f| f.segment_id).collect();
        assert_eq!(ids, vec![3, 12]);
    }

    #[test]
    fn reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("5.dat"), "garbage").unwrap();

        let result = inspect(dir.path(), Codec::Json).unwrap();

        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].elements.is_none());
        assert!(result.files[0].error.is_some());
    }

    #[test]
    fn decodes_cbor() {
        let dir = tempfile::tempdir().unwrap();
        CborFilePersister::new()
            .write(&dir.path().join("1.dat"), &["a".to_string(), "b".to_string()])
            .unwrap();

        let result = inspect(dir.path(), Codec::Cbor).unwrap();
        assert_eq!(result.total_elements, 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = inspect(&dir.path().join("nope"), Codec::Json);
        assert!(matches!(result, Err(CliError::NotADirectory(_))));
    }
}
