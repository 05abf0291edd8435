//! CLI command implementations.

pub mod inspect;
pub mod soak;

use std::str::FromStr;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Unrecognized spill file encoding.
    #[error("unknown codec {0:?} (expected json or cbor)")]
    UnknownCodec(String),

    /// The given path is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(std::path::PathBuf),

    /// Queue error.
    #[error(transparent)]
    Queue(#[from] spillq_core::QueueError),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A soak run finished with lost, duplicated or reordered elements.
    #[error("soak run failed verification: {0}")]
    SoakFailed(String),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Spill file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// JSON arrays.
    Json,
    /// CBOR arrays.
    Cbor,
}

impl FromStr for Codec {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            _ => Err(CliError::UnknownCodec(s.to_string())),
        }
    }
}
