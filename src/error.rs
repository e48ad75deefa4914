//! Error types for IME history decoding.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// A convenience `Result` type alias using the crate's `HistoryError` type.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur while locating, reading or decoding a history file.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The target history file does not exist.
    #[error("File not exists {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Fewer bytes remain than a fixed or declared-length field requires.
    #[error(
        "truncated input while reading {context} at offset {offset:#x}: needed {needed} bytes, {available} available"
    )]
    TruncatedInput {
        context: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A FILETIME value cannot be represented as a calendar datetime.
    #[error("timestamp {ticks:#x} at offset {offset:#x} is outside the representable range")]
    TimestampOutOfRange { ticks: u64, offset: usize },

    /// A ZIP archive was given but none of its members is a history file.
    #[error("no history file found in archive {name}")]
    NoHistoryInArchive { name: String },

    /// No path was given and the default location could not be resolved.
    #[error("no input path given and %{var}% is not set")]
    MissingDefaultLocation { var: &'static str },

    /// An unknown time zone name was configured.
    #[error("unknown time zone {name}: {message}")]
    UnknownTimeZone { name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HistoryError {
    /// Create a truncated input error.
    pub fn truncated(context: &'static str, offset: usize, needed: usize, available: usize) -> Self {
        Self::TruncatedInput {
            context,
            offset,
            needed,
            available,
        }
    }

    /// Short, stable name of the fault kind, used by the failure report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "FileNotFound",
            Self::TruncatedInput { .. } => "TruncatedInput",
            Self::TimestampOutOfRange { .. } => "TimestampOutOfRange",
            Self::NoHistoryInArchive { .. } => "NoHistoryInArchive",
            Self::MissingDefaultLocation { .. } => "MissingDefaultLocation",
            Self::UnknownTimeZone { .. } => "UnknownTimeZone",
            Self::Io(_) => "Io",
            Self::Zip(_) => "Zip",
            Self::Json(_) => "Json",
        }
    }

    /// Byte offset inside the decoded buffer where the fault happened, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::TruncatedInput { offset, .. } | Self::TimestampOutOfRange { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

/// Which text block of a sub-entry a string was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBlock {
    Input,
    Result,
}

/// A malformed UTF-16 sequence that was replaced with U+FFFD.
///
/// Non-fatal: decoding continues and the warning is collected alongside the
/// recovered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDecodeWarning {
    /// Offset of the first byte of the text block.
    pub offset: usize,
    pub block: TextBlock,
    /// Number of replacement characters inserted by the decoder.
    pub replaced: usize,
}
