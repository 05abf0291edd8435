//! # spillq Storage
//!
//! Batch persisters for spillq.
//!
//! A persister turns one ordered batch of queue elements into one file and
//! back. It is the only place that knows about encodings; the queue engine
//! owns file naming, retries and accounting.
//!
//! ## Design Principles
//!
//! - One batch per file, written whole, read whole
//! - Order is preserved exactly
//! - A failed write leaves no file behind
//! - Must be `Send + Sync`; one persister serves every segment of a queue
//!
//! ## Available Persisters
//!
//! - [`JsonFilePersister`] - Default, self-describing JSON arrays
//! - [`CborFilePersister`] - Compact CBOR arrays
//! - [`FaultyPersister`] - Wrapper that fails writes or reads on demand
//!
//! ## Example
//!
//! ```rust
//! use spillq_storage::{BatchPersister, JsonFilePersister};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("1.dat");
//! let persister = JsonFilePersister::new();
//! persister.write(&path, &["a".to_string(), "b".to_string()]).unwrap();
//! let batch: Vec<String> = persister.read(&path).unwrap();
//! assert_eq!(batch, vec!["a", "b"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod fault;
mod json;
mod persister;

pub use cbor::CborFilePersister;
pub use error::{StorageError, StorageResult};
pub use fault::FaultyPersister;
pub use json::JsonFilePersister;
pub use persister::{BatchPersister, SPILL_FILE_EXTENSION};
