//! Error taxonomy for document package operations
//!
//! Library functions return `Result<T, DocxError>`. Per-file failures in
//! bulk operations are captured into the file's `MatchResult` instead of
//! aborting the batch; see the `bulk` module.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocxError>;

#[derive(Debug, Error)]
pub enum DocxError {
    /// The file cannot be read as a valid zip package.
    #[error("not a valid .docx package: {0}")]
    CorruptPackage(String),

    /// A mandatory part (e.g. `word/document.xml`) is missing.
    #[error("missing required part: {0}")]
    PartNotFound(String),

    /// A part's XML could not be parsed.
    #[error("malformed XML in {part}: {message}")]
    MalformedXml { part: String, message: String },

    /// Empty search query, rejected before any file I/O.
    #[error("search query must not be empty")]
    InvalidQuery,

    /// Pattern mode received an invalid regular expression.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),

    /// Neither the preferred nor the fallback backup location is usable.
    #[error("backup failed: {0}")]
    BackupFailed(String),

    /// Persisting a mutated document failed; the original is untouched.
    #[error("write failed for {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
