//! Error types for persister operations.

use std::io;
use thiserror::Error;

/// Result type for persister operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while writing or reading a spill file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The batch could not be encoded.
    #[error("encoding failed: {message}")]
    Encode {
        /// Description of the encoding error.
        message: String,
    },

    /// The file contents could not be decoded into a batch.
    #[error("decoding failed: {message}")]
    Decode {
        /// Description of the decoding error.
        message: String,
    },

    /// A failure injected by [`crate::FaultyPersister`].
    #[error("injected {operation} failure")]
    Injected {
        /// The operation that was failed (`write` or `read`).
        operation: &'static str,
    },
}

impl StorageError {
    /// Creates an encoding error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates a decoding error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
