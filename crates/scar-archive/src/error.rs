//! Error types for archive reading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening, decoding or validating an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The path could not be opened at all.
    #[error("cannot open file {path}: {source}")]
    OpenFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Fewer bytes than the minimum header length are available.
    #[error("file is too short to be a scene archive")]
    TooShort,

    /// The data is not a scene archive, or a container structure inside it
    /// is broken.
    #[error("invalid scene archive: {message}")]
    FormatFailure { message: String },

    /// A structurally valid legacy header declares non-native endianness.
    /// There is no conversion path.
    #[error("archive was written with non-native endianness, which is no longer supported")]
    EndianUnsupported,

    /// The header tag matched but its fields are unrecognized; the file is
    /// probably from a newer build.
    #[error("incomplete header, archive may be from a newer version")]
    FutureVersion,

    /// The header decoded but the embedded type-layout table could not be
    /// resolved.
    #[error("cannot resolve type layout: {reason}")]
    StructLayoutFailure { reason: String },

    /// I/O error below the format layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create a `FormatFailure` error.
    pub fn format_failure(message: impl Into<String>) -> Self {
        Self::FormatFailure {
            message: message.into(),
        }
    }
}
